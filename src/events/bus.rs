//! # Measurement channel.
//!
//! [`Bus`] is a thin wrapper around a bounded [`tokio::sync::mpsc`] channel.
//! Every probe and the reconciler hold a clone; the aggregator owns the only
//! receiver.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Consumer (one):
//!   ProbeTask n1 ──┐
//!   ProbeTask n2 ──┼──────► Bus ───────► Aggregator
//!   ProbeTask nN ──┤    (mpsc, bounded)
//!   Reconciler   ──┘
//! ```
//!
//! ## Rules
//! - **Backpressure**: `publish()` waits for room when the channel is full.
//! - **Per-producer FIFO**: events from one task arrive in emission order.
//! - **Closed channel**: once the aggregator is gone, events are dropped silently.

use tokio::sync::mpsc;

use super::event::Event;

/// Receiving half, owned by the aggregator.
pub type EventStream = mpsc::Receiver<Event>;

/// Sending half of the measurement channel.
///
/// Cheap to clone (internally an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: mpsc::Sender<Event>,
}

impl Bus {
    /// Creates a new channel with the given capacity (clamped to at least 1).
    pub fn channel(capacity: usize) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel::<Event>(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Delivers an event to the aggregator, waiting for room if necessary.
    ///
    /// Returns `false` if the aggregator has stopped.
    pub async fn publish(&self, ev: Event) -> bool {
        self.tx.send(ev).await.is_ok()
    }

    /// True once the aggregator dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
