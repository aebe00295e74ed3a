//! Live dashboard client for a dataflow trace backend.
//!
//! A [`Session`] keeps one websocket open, demultiplexes PAG/AGG/ALL/MET/INV
//! frames into per-kind stores and hands projected charts, timeline geometry
//! and invariant logs to a [`Renderer`].

pub mod config;
pub mod connection;
pub mod dataflow;
pub mod epoch;
pub mod highlight;
pub mod invariants;
pub mod projection;
pub mod renderer;
pub mod session;
pub mod stores;
pub mod view_settings;
pub mod visualizer;

pub use config::{DashboardConfig, load_config};
pub use renderer::{LogRenderer, NullRenderer, Renderer};
pub use session::Session;
