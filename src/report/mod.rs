//! # Reporting.
//!
//! - [`Snapshot`] - mutable per-target counters owned by the aggregator
//! - [`render`] - pure snapshot → exposition text
//! - [`Publisher`] - lock-guarded slot holding the last rendered report

mod publisher;
mod render;
mod snapshot;

pub use publisher::Publisher;
pub use render::{CONTENT_TYPE, render};
pub use snapshot::{Counters, Entry, Snapshot};
