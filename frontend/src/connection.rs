use crate::config::ConnectionConfig;
use crate::dataflow::{Actor, Relay, TaskHandle};
use crate::stores::{SessionInput, StoreSet};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::{SinkExt, StreamExt};
use shared::{DownMsg, UpMsg};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};

/// Lifecycle and traffic of the backend connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A socket is open. `session` counts successful connects from 1.
    Connected { session: u64 },
    Frame(DownMsg),
    Disconnected { session: u64 },
    /// Reconnect attempts are exhausted; no further events follow.
    GaveUp { attempts: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

enum SessionEnd {
    ServerClosed,
    Shutdown,
}

/// Actor+Relay compatible connection adapter
///
/// Owns the socket task. Requests go out through [`ConnectionAdapter::send_up_msg`];
/// everything coming back is reported as [`ConnectionEvent`]s.
#[derive(Clone, Debug)]
pub struct ConnectionAdapter {
    outbound: UnboundedSender<UpMsg>,
    _task: Option<Arc<TaskHandle>>,
}

impl ConnectionAdapter {
    pub fn new(config: ConnectionConfig) -> (Self, UnboundedReceiver<ConnectionEvent>) {
        let (outbound, outbound_stream) = unbounded::<UpMsg>();
        let (event_sender, event_stream) = unbounded::<ConnectionEvent>();

        let task = TaskHandle::spawn(run_connection(config, outbound_stream, event_sender));

        let adapter = ConnectionAdapter {
            outbound,
            _task: Some(Arc::new(task)),
        };
        (adapter, event_stream)
    }

    /// Adapter without a socket; requests are handed to the returned stream.
    #[cfg(test)]
    pub(crate) fn loopback() -> (Self, UnboundedReceiver<UpMsg>) {
        let (outbound, outbound_stream) = unbounded::<UpMsg>();
        (ConnectionAdapter { outbound, _task: None }, outbound_stream)
    }

    /// Queue a request. Requests queued during a reconnect backoff are dropped.
    pub fn send_up_msg(&self, up_msg: UpMsg) {
        if self.outbound.unbounded_send(up_msg).is_err() {
            log::debug!("Connection task stopped, dropping {} request", up_msg.kind());
        }
    }
}

async fn run_connection(
    config: ConnectionConfig,
    mut outbound: UnboundedReceiver<UpMsg>,
    events: UnboundedSender<ConnectionEvent>,
) {
    let reconnect = config.reconnect;
    let mut session = 0_u64;
    let mut failures = 0_u32;

    loop {
        match connect_async(config.url.as_str()).await {
            Ok((socket, _response)) => {
                failures = 0;
                session += 1;
                log::info!("Connected to {} (session {})", config.url, session);
                if events
                    .unbounded_send(ConnectionEvent::Connected { session })
                    .is_err()
                {
                    return;
                }

                match pump(socket, &mut outbound, &events).await {
                    Ok(SessionEnd::Shutdown) => return,
                    Ok(SessionEnd::ServerClosed) => {
                        log::info!("Backend closed session {}", session);
                    }
                    Err(error) => {
                        log::warn!("Session {} ended: {}", session, error);
                    }
                }
                if events
                    .unbounded_send(ConnectionEvent::Disconnected { session })
                    .is_err()
                {
                    return;
                }
            }
            Err(error) => {
                failures += 1;
                log::warn!(
                    "Connection to {} failed (attempt {}): {}",
                    config.url,
                    failures,
                    error
                );
            }
        }

        if reconnect.exhausted(failures) {
            log::error!(
                "Giving up on {} after {} failed attempts",
                config.url,
                failures
            );
            let _ = events.unbounded_send(ConnectionEvent::GaveUp { attempts: failures });
            return;
        }

        let delay = reconnect.delay_for(failures.max(1));
        if !wait_dropping_requests(delay, &mut outbound).await {
            return;
        }
    }
}

/// Sleep for `delay`, discarding requests queued meanwhile. Returns false
/// once the adapter is gone.
async fn wait_dropping_requests(delay: Duration, outbound: &mut UnboundedReceiver<UpMsg>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            request = outbound.next() => match request {
                Some(request) => {
                    log::debug!("Not connected, dropping {} request", request.kind());
                }
                None => return false,
            },
        }
    }
}

async fn pump<S>(
    socket: WebSocketStream<S>,
    outbound: &mut UnboundedReceiver<UpMsg>,
    events: &UnboundedSender<ConnectionEvent>,
) -> Result<SessionEnd, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            request = outbound.next() => {
                let Some(request) = request else {
                    let _ = ws_sender.close().await;
                    return Ok(SessionEnd::Shutdown);
                };
                let text = serde_json::to_string(&request)?;
                log::debug!("-> {}", text);
                ws_sender.send(Message::Text(text)).await?;
            }
            message = ws_receiver.next() => match message {
                Some(Ok(Message::Text(text))) => match DownMsg::decode(&text) {
                    Ok(down_msg) => {
                        if events.unbounded_send(ConnectionEvent::Frame(down_msg)).is_err() {
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    Err(error) => log::warn!("Dropping frame: {}", error),
                },
                Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::ServerClosed),
                Some(Ok(_)) => {}
                Some(Err(error)) => return Err(error.into()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected { session: u64 },
    Disconnected { session: u64 },
    GaveUp { attempts: u32 },
}

/// Create message processor that handles connection events with store access
pub fn create_connection_message_handler(
    mut events: UnboundedReceiver<ConnectionEvent>,
    stores: &StoreSet,
    connection_established_relay: Relay<u64>,
) -> Actor<ConnectionStatus> {
    let stores = stores.clone();

    Actor::new(ConnectionStatus::Connecting, async move |state| {
        while let Some(event) = events.next().await {
            match event {
                ConnectionEvent::Connected { session } => {
                    if session > 1 {
                        stores.restart_session();
                    }
                    state.set(ConnectionStatus::Connected { session });
                    connection_established_relay.send(session);
                }
                ConnectionEvent::Frame(down_msg) => handle_down_msg(down_msg, &stores),
                ConnectionEvent::Disconnected { session } => {
                    state.set(ConnectionStatus::Disconnected { session });
                }
                ConnectionEvent::GaveUp { attempts } => {
                    state.set(ConnectionStatus::GaveUp { attempts });
                }
            }
        }
    })
}

/// Route one decoded frame to the store that owns its kind.
pub fn handle_down_msg(down_msg: DownMsg, stores: &StoreSet) {
    match down_msg {
        DownMsg::ActivityEdges(edges) => stores.pag_received_relay.send(edges),
        DownMsg::Aggregates(records) => stores.agg_received_relay.send(records),
        DownMsg::Correlations(pairs) => {
            stores.all_received_relay.send(SessionInput::Received(pairs))
        }
        DownMsg::Metrics(records) => stores.met_received_relay.send(records),
        DownMsg::Invariants(reports) => {
            stores.inv_received_relay.send(SessionInput::Received(reports))
        }
    }
}
