//! Trace dashboard entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use trace_dashboard::{DashboardConfig, LogRenderer, Session, load_config};

#[derive(Parser)]
#[command(name = "trace-dashboard")]
#[command(about = "Live dashboard for a dataflow trace backend")]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Backend websocket endpoint, overrides the config file
    #[arg(long)]
    url: Option<String>,

    /// Epoch to request on connect
    #[arg(long)]
    epoch: Option<u64>,
}

fn resolve_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.connection.url = url.clone();
    }
    if let Some(epoch) = cli.epoch {
        config.view.initial_epoch = epoch;
    }
    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let session = Session::start(&config, LogRenderer::default());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        log::info!("Type an epoch number and press enter to switch epochs");
        loop {
            tokio::select! {
                line = lines.next_line(), if stdin_open => match line.context("Failed to read stdin")? {
                    Some(line) => session.set_epoch_input(line),
                    None => stdin_open = false,
                },
                status = session.closed() => {
                    log::warn!("Backend unreachable: {:?}", status);
                    break;
                }
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for ctrl-c")?;
                    break;
                }
            }
        }

        session.shutdown();
        Ok(())
    })
}
