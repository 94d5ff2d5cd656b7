//! Runtime events: types and the measurement channel.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::mpsc`
//!
//! ## Quick reference
//! - **Publishers**: every `ProbeTask`, the `Reconciler` (directory
//!   measurements and retirements).
//! - **Consumer**: the `Aggregator`.

mod bus;
mod event;

pub use bus::{Bus, EventStream};
pub use event::{Event, EventKind};
