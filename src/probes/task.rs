//! # ProbeTask: one target, one loop.
//!
//! Dials one [`Target`] once per interval and reports every attempt to the
//! [`Bus`], until its [`CancellationToken`] fires.
//!
//! ## Event flow
//! ```text
//! tick ──► attempt ──► Ok          ──► Reply{latency}
//!                  ──► Err/timeout ──► Lost{reason}
//! ```
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► select { cancelled ─► exit, tick ─► continue }
//!   ├─► channel closed? ─► exit without dialing
//!   ├─► attempt (bounded by timeout, never interrupted by cancel)
//!   ├─► cancelled? ─► discard result, exit
//!   └─► select { cancelled ─► exit, publish(event) }
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** (never concurrent for one target)
//! - The attempt timeout is **strictly below** the interval, so a tick is never skipped by a slow attempt
//! - No event is published **after** cancellation was observed
//! - Failed attempts are not retried; the next tick is the retry

use std::time::Duration;

use tokio::select;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    directory::Target,
    error::ProbeError,
    events::{Bus, Event},
    probes::ProberRef,
};

/// Why a probe loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeExit {
    /// Token was cancelled (stop requested or runtime shutdown).
    Cancelled,
    /// Aggregator dropped its receiver; nothing left to report to.
    ChannelClosed,
}

/// Schedule of one probe.
#[derive(Clone, Copy, Debug)]
pub struct ProbeParams {
    /// Period between attempts.
    pub interval: Duration,
    /// Upper bound of one attempt.
    pub timeout: Duration,
}

/// Periodic handshake loop for a single target.
pub struct ProbeTask {
    target: Target,
    prober: ProberRef,
    bus: Bus,
    params: ProbeParams,
}

impl ProbeTask {
    /// Creates a new probe task.
    pub fn new(target: Target, prober: ProberRef, bus: Bus, params: ProbeParams) -> Self {
        Self {
            target,
            prober,
            bus,
            params,
        }
    }

    /// Runs until `token` is cancelled or the channel closes.
    ///
    /// The first attempt happens immediately; later ones every
    /// `params.interval`. A cancellation that arrives mid-attempt lets the
    /// attempt finish (at most `params.timeout`) and then drops its result.
    pub async fn run(self, token: CancellationToken) -> ProbeExit {
        info!(
            target_name = %self.target.name,
            address = %self.target.address,
            prober = self.prober.name(),
            "probe start"
        );

        let mut ticker = time::interval(self.params.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            select! {
                biased;
                _ = token.cancelled() => break ProbeExit::Cancelled,
                _ = ticker.tick() => {}
            }

            if self.bus.is_closed() {
                break ProbeExit::ChannelClosed;
            }
            let event = self.attempt().await;
            if token.is_cancelled() {
                break ProbeExit::Cancelled;
            }

            select! {
                biased;
                _ = token.cancelled() => break ProbeExit::Cancelled,
                delivered = self.bus.publish(event) => {
                    if !delivered {
                        break ProbeExit::ChannelClosed;
                    }
                }
            }
        };

        info!(target_name = %self.target.name, ?exit, "probe stop");
        exit
    }

    /// Executes a single handshake bounded by the attempt timeout.
    async fn attempt(&self) -> Event {
        let started = Instant::now();
        let timeout = self.params.timeout;

        let res = match time::timeout(timeout, self.prober.probe(&self.target.address)).await {
            Ok(r) => r,
            Err(_elapsed) => Err(ProbeError::Timeout { timeout }),
        };

        match res {
            Ok(()) => Event::reply(self.target.clone(), started.elapsed()),
            Err(e) => {
                debug!(
                    target_name = %self.target.name,
                    address = %self.target.address,
                    label = e.as_label(),
                    error = %e,
                    "probe attempt lost"
                );
                Event::lost(self.target.clone()).with_reason(e.to_string())
            }
        }
    }
}
