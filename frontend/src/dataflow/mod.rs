//! Core dataflow primitives for reactive state management
//!
//! This module provides the Actor+Relay components the dashboard session is
//! assembled from. They are independent of any trace-specific logic.
//!
//! # Core Components
//!
//! - **[`Relay`]** - Type-safe event streaming using simple channels
//! - **[`Actor`]** - Single-value reactive state container
//! - **[`TaskHandle`]** - Owned background task, aborted on drop
//!
//! # Architecture Principles
//!
//! 1. **Event-Source Naming** - Relays follow `{source}_{event}_relay` pattern
//! 2. **Single Point of Mutation** - Only the Actor's processor writes its state
//! 3. **Snapshots For Readers** - Readers observe `Arc` snapshots via signals

pub mod actor;
pub mod relay;

pub use actor::{Actor, ActorState, TaskHandle};
pub use relay::{Relay, relay};
