//! # Events emitted by probes and the reconciler.
//!
//! The [`EventKind`] enum covers two categories:
//! - **Measurements**: one handshake attempt or one directory fetch (`Reply`, `Lost`)
//! - **Lifecycle**: a target left the registry (`Retired`)
//!
//! ## Ordering guarantees
//! Each event carries a process-wide sequence number (`seq`) that increases
//! monotonically. Events of one producer reach the aggregator in `seq` order;
//! events of different producers may interleave.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use probevisor::{Event, EventKind, Target};
//!
//! let ev = Event::reply(Target::new("n1", "10.0.0.1:10250"), Duration::from_millis(3));
//!
//! assert_eq!(ev.kind, EventKind::Reply);
//! assert_eq!(ev.latency_ms, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use crate::directory::Target;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Attempt succeeded.
    ///
    /// Sets:
    /// - `target`: probed target (or the directory pseudo-target)
    /// - `latency_ms`: time from attempt start to handshake completion
    Reply,

    /// Attempt failed or timed out.
    ///
    /// Sets:
    /// - `target`: probed target (or the directory pseudo-target)
    /// - `reason`: failure message, if any
    Lost,

    /// Target was removed from the registry (dropped or replaced) and its probe
    /// has acknowledged the stop. No further event for this probe follows.
    ///
    /// Sets:
    /// - `target`: the retired target
    Retired,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Event classification.
    pub kind: EventKind,
    /// Target the event is about.
    pub target: Target,
    /// Measured latency in milliseconds (`Reply` only).
    pub latency_ms: Option<u64>,
    /// Human-readable reason (`Lost` only).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the next sequence number.
    pub fn new(kind: EventKind, target: Target) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            target,
            latency_ms: None,
            reason: None,
        }
    }

    /// Successful attempt that took `latency`.
    #[inline]
    pub fn reply(target: Target, latency: Duration) -> Self {
        Event::new(EventKind::Reply, target).with_latency(latency)
    }

    /// Failed attempt.
    #[inline]
    pub fn lost(target: Target) -> Self {
        Event::new(EventKind::Lost, target)
    }

    /// Target retired from the registry.
    #[inline]
    pub fn retired(target: Target) -> Self {
        Event::new(EventKind::Retired, target)
    }

    /// Attaches a latency (stored as whole milliseconds).
    #[inline]
    pub fn with_latency(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
        self.latency_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for `Reply`/`Lost`.
    #[inline]
    pub fn is_measurement(&self) -> bool {
        matches!(self.kind, EventKind::Reply | EventKind::Lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let t = Target::new("n1", "10.0.0.1:1");
        let a = Event::lost(t.clone());
        let b = Event::retired(t);
        assert!(b.seq > a.seq);
        assert!(a.is_measurement());
        assert!(!b.is_measurement());
    }

    #[test]
    fn latency_is_truncated_to_millis() {
        let ev = Event::reply(Target::new("n1", "x:1"), Duration::from_micros(2_999));
        assert_eq!(ev.latency_ms, Some(2));
        assert!(ev.reason.is_none());
    }
}
