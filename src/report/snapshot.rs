//! # Per-target counters.
//!
//! [`Snapshot`] is the aggregator's mutable state: one [`Entry`] per target
//! name, kept in name order so rendered reports are stable.
//!
//! ## Rules
//! - `Reply` → `reply += 1`, `time_ms += latency`
//! - `Lost` → `lost += 1`
//! - `Retired` → entry dropped, unless it already belongs to a newer address
//! - The entry's address label follows the most recent measurement

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::directory::Target;
use crate::events::{Event, EventKind};

/// Cumulative measurements of one target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Successful attempts.
    pub reply: u64,
    /// Failed or timed out attempts.
    pub lost: u64,
    /// Sum of successful attempt latencies, in milliseconds.
    pub time_ms: u64,
}

/// One row of the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Target the counters are labelled with.
    pub target: Target,
    /// Accumulated counters.
    pub counters: Counters,
}

/// Counters of every known target, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    entries: BTreeMap<Arc<str>, Entry>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event.
    pub fn record(&mut self, ev: &Event) {
        match ev.kind {
            EventKind::Reply => {
                let counters = self.entry(&ev.target);
                counters.reply += 1;
                counters.time_ms = counters.time_ms.saturating_add(ev.latency_ms.unwrap_or(0));
            }
            EventKind::Lost => {
                self.entry(&ev.target).lost += 1;
            }
            EventKind::Retired => self.retire(&ev.target),
        }
    }

    /// Drops the entry of `target` if it is still labelled with that address.
    pub fn retire(&mut self, target: &Target) {
        if self
            .entries
            .get(&target.name)
            .is_some_and(|e| e.target.address == target.address)
        {
            self.entries.remove(&target.name);
        }
    }

    /// Zeroes every entry's counters, keeping the entries.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.counters = Counters::default();
        }
    }

    /// Entry for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no target has been measured yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&mut self, target: &Target) -> &mut Counters {
        let entry = self
            .entries
            .entry(target.name.clone())
            .or_insert_with(|| Entry {
                target: target.clone(),
                counters: Counters::default(),
            });
        if entry.target.address != target.address {
            entry.target = target.clone();
        }
        &mut entry.counters
    }
}
