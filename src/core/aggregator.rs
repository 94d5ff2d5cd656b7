//! # Aggregator: events in, reports out.
//!
//! Sole consumer of the measurement channel. Folds every [`Event`] into a
//! [`Snapshot`] and, every publish interval, renders it and swaps the result
//! into the [`Publisher`].
//!
//! ## Loop
//! ```text
//! select {
//!   event   ─► snapshot.record(event)
//!   tick    ─► render ─► publisher.publish ─► (Windowed: snapshot.reset)
//!   cancel  ─► drain buffered events ─► final publish ─► exit
//! }
//! ```
//!
//! ## Rules
//! - The snapshot is owned here; other components only ever see rendered bytes
//! - Rendering happens **before** the lock is taken; the swap is the only critical section
//! - The same [`CounterMode`] applies to every entry, the directory included

use std::time::Duration;

use tokio::select;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CounterMode;
use crate::events::{Event, EventStream};
use crate::report::{Publisher, Snapshot, render};

/// Consumer side of the measurement pipeline.
pub struct Aggregator {
    events: EventStream,
    snapshot: Snapshot,
    publisher: Publisher,
    prefix: String,
    every: Duration,
    mode: CounterMode,
}

impl Aggregator {
    /// Creates an aggregator publishing every `every`.
    pub fn new(
        events: EventStream,
        publisher: Publisher,
        prefix: impl Into<String>,
        every: Duration,
        mode: CounterMode,
    ) -> Self {
        Self {
            events,
            snapshot: Snapshot::new(),
            publisher,
            prefix: prefix.into(),
            every,
            mode,
        }
    }

    /// Current, unpublished counters.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Runs until `token` is cancelled or every producer is gone.
    ///
    /// The first report is published one interval after start; a final report
    /// is published on exit.
    pub async fn run(mut self, token: CancellationToken) {
        info!(every = ?self.every, mode = ?self.mode, "collect init");

        let mut ticker = time::interval_at(Instant::now() + self.every, self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                _ = token.cancelled() => break,
                ev = self.events.recv() => match ev {
                    Some(ev) => self.record(&ev),
                    None => break,
                },
                _ = ticker.tick() => self.publish().await,
            }
        }

        while let Ok(ev) = self.events.try_recv() {
            self.record(&ev);
        }
        self.publish().await;
        info!("collect stop");
    }

    /// Applies one event to the snapshot.
    pub fn record(&mut self, ev: &Event) {
        self.snapshot.record(ev);
    }

    /// Renders the snapshot, hands it to the publisher, then applies the
    /// counter mode.
    pub async fn publish(&mut self) {
        let report = render(&self.snapshot, &self.prefix);
        debug!(targets = self.snapshot.len(), bytes = report.len(), "publishing report");
        self.publisher.publish(report).await;

        if self.mode == CounterMode::Windowed {
            self.snapshot.reset();
        }
    }
}
