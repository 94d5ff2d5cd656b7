//! # Probe registry - live probe handles by target name.
//!
//! The registry is owned by the reconciler task and never shared, so it is a
//! plain map without a lock.
//!
//! ## Architecture
//! ```text
//! Reconciler ──► Registry
//!                  ├─► spawn(target)  → ProbeTask::run(child_token) + Handle
//!                  ├─► stop(name)     → cancel → join (≤ stop deadline) → Retired
//!                  └─► stop_all()     → cancel all → join all (shutdown)
//! ```
//!
//! ## Rules
//! - At most **one** handle per name; `spawn` refuses a name that is present
//! - `stop` returns only after the probe acknowledged (or was aborted), so a
//!   replacement never overlaps its predecessor
//! - `Retired` is published after the join, so it follows the probe's last event

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::directory::Target;
use crate::events::{Bus, Event};
use crate::probes::{ProbeExit, ProbeParams, ProbeTask, ProberRef};

/// Handle to a running probe task.
struct Handle {
    /// Target the probe was started for.
    target: Target,
    /// Join handle of the probe loop.
    join: JoinHandle<ProbeExit>,
    /// Individual cancellation token for this probe.
    cancel: CancellationToken,
}

/// How a stop request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// Probe exited on its own after cancellation.
    Acknowledged,
    /// Probe missed the stop deadline and was aborted.
    Aborted,
    /// Probe task panicked.
    Panicked,
}

/// Registry of live probes.
pub struct Registry {
    tasks: HashMap<Arc<str>, Handle>,
    bus: Bus,
    prober: ProberRef,
    runtime_token: CancellationToken,
    params: ProbeParams,
    stop_deadline: Duration,
}

impl Registry {
    /// Creates an empty registry.
    ///
    /// Probe tokens are children of `runtime_token`, so cancelling it stops
    /// every probe even if the registry itself is gone.
    pub fn new(
        bus: Bus,
        prober: ProberRef,
        runtime_token: CancellationToken,
        params: ProbeParams,
        stop_deadline: Duration,
    ) -> Self {
        Self {
            tasks: HashMap::new(),
            bus,
            prober,
            runtime_token,
            params,
            stop_deadline,
        }
    }

    /// Target currently probed under `name`.
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.tasks.get(name).map(|h| &h.target)
    }

    /// Returns sorted list of live target names.
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.tasks.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of live probes.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Starts a probe for `target`.
    ///
    /// Returns `false` (and starts nothing) if a probe with the same name is
    /// already registered.
    pub fn spawn(&mut self, target: Target) -> bool {
        if self.tasks.contains_key(&target.name) {
            warn!(target_name = %target.name, "probe already registered");
            return false;
        }

        let token = self.runtime_token.child_token();
        let task = ProbeTask::new(
            target.clone(),
            Arc::clone(&self.prober),
            self.bus.clone(),
            self.params,
        );
        let join = tokio::spawn(task.run(token.clone()));

        self.tasks.insert(
            target.name.clone(),
            Handle {
                target,
                join,
                cancel: token,
            },
        );
        true
    }

    /// Cancels the probe for `name`, waits for it, and publishes `Retired`.
    ///
    /// Returns the retired target and how the stop ended, or `None` if no
    /// probe is registered under `name`.
    pub async fn stop(&mut self, name: &str) -> Option<(Target, StopOutcome)> {
        let handle = self.tasks.remove(name)?;
        handle.cancel.cancel();
        let outcome = self.join_with_deadline(&handle.target, handle.join).await;
        self.bus.publish(Event::retired(handle.target.clone())).await;
        Some((handle.target, outcome))
    }

    /// Cancels every probe and waits for all of them concurrently.
    ///
    /// Used on shutdown; no `Retired` events are published.
    pub async fn stop_all(&mut self) {
        let handles: Vec<Handle> = self.tasks.drain().map(|(_, h)| h).collect();
        for h in &handles {
            h.cancel.cancel();
        }

        let this = &*self;
        futures::future::join_all(
            handles
                .into_iter()
                .map(|h| async move { this.join_with_deadline(&h.target, h.join).await }),
        )
        .await;
    }

    /// Awaits the probe for at most the stop deadline, aborting it on overrun.
    async fn join_with_deadline(
        &self,
        target: &Target,
        mut join: JoinHandle<ProbeExit>,
    ) -> StopOutcome {
        match time::timeout(self.stop_deadline, &mut join).await {
            Ok(Ok(exit)) => {
                debug!(target_name = %target.name, ?exit, "probe acknowledged stop");
                StopOutcome::Acknowledged
            }
            Ok(Err(e)) => {
                error!(target_name = %target.name, error = %e, "probe task panicked");
                StopOutcome::Panicked
            }
            Err(_elapsed) => {
                warn!(
                    target_name = %target.name,
                    deadline = ?self.stop_deadline,
                    "probe missed stop deadline; aborting"
                );
                join.abort();
                let _ = join.await;
                StopOutcome::Aborted
            }
        }
    }
}
