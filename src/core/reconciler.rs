//! # Reconciler: keeps live probes in sync with the directory.
//!
//! Every scan interval the reconciler asks the [`TargetLister`] for the
//! current targets and diffs them against its [`Registry`].
//!
//! ## Scan
//! ```text
//! list() ──► Err ──► Lost(API) ──► keep every probe as is
//!        └─► Ok  ──► Reply(API, fetch time) ──► reconcile(targets)
//!
//! reconcile(targets):
//!   for target in targets (first occurrence of a name wins):
//!     ├─ unknown name          ─► spawn                      (started)
//!     ├─ same name, same addr  ─► keep                       (unchanged)
//!     └─ same name, new addr   ─► stop old ─► spawn new      (replaced)
//!   for name in registry, not in targets:
//!     └─ stop                                                (removed)
//! ```
//!
//! ## Rules
//! - Identity is the **name**; an address change is always a replacement
//! - A replacement **stops before it starts**: two probes never share a name
//! - A failed fetch never touches live probes
//! - A listed target carrying the directory's reserved name is never probed
//! - The registry is owned here and nowhere else

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::registry::Registry;
use crate::directory::{Target, TargetLister};
use crate::error::ListError;
use crate::events::{Bus, Event};

/// What one reconciliation changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Names whose probe was started for the first time.
    pub started: Vec<Arc<str>>,
    /// Names whose probe was restarted on a new address.
    pub replaced: Vec<Arc<str>>,
    /// Names whose probe was stopped because the directory dropped them.
    pub removed: Vec<Arc<str>>,
    /// Targets left running as they were.
    pub unchanged: usize,
}

impl ReconcileOutcome {
    /// True if no probe was started or stopped.
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.replaced.is_empty() && self.removed.is_empty()
    }
}

/// Periodic directory scan driving the probe registry.
pub struct Reconciler {
    lister: Arc<dyn TargetLister>,
    registry: Registry,
    bus: Bus,
    directory: Target,
    scan_interval: Duration,
}

impl Reconciler {
    /// Creates a reconciler around an empty `registry`.
    ///
    /// `directory` is the pseudo-target that fetch measurements are reported
    /// under.
    pub fn new(
        lister: Arc<dyn TargetLister>,
        registry: Registry,
        bus: Bus,
        directory: Target,
        scan_interval: Duration,
    ) -> Self {
        Self {
            lister,
            registry,
            bus,
            directory,
            scan_interval,
        }
    }

    /// Live probe registry (read-only).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scans immediately, then every scan interval, until `token` is cancelled.
    ///
    /// On exit every live probe is cancelled and awaited.
    pub async fn run(mut self, token: CancellationToken) {
        info!(lister = self.lister.name(), every = ?self.scan_interval, "scan init");

        let mut ticker = time::interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            let listed = select! {
                biased;
                _ = token.cancelled() => break,
                listed = self.lister.list() => listed,
            };
            self.apply(listed, started.elapsed()).await;
        }

        info!(live = self.registry.len(), "scan stop");
        self.registry.stop_all().await;
    }

    /// Fetches the target list once and reconciles against it.
    ///
    /// Returns `None` if the fetch failed.
    pub async fn scan(&mut self) -> Option<ReconcileOutcome> {
        let started = Instant::now();
        let listed = self.lister.list().await;
        self.apply(listed, started.elapsed()).await
    }

    async fn apply(
        &mut self,
        listed: Result<Vec<Target>, ListError>,
        took: Duration,
    ) -> Option<ReconcileOutcome> {
        match listed {
            Err(e) => {
                warn!(label = e.as_label(), error = %e, "scan fetch failed");
                self.bus
                    .publish(Event::lost(self.directory.clone()).with_reason(e.to_string()))
                    .await;
                None
            }
            Ok(targets) => {
                self.bus
                    .publish(Event::reply(self.directory.clone(), took))
                    .await;
                Some(self.reconcile(targets).await)
            }
        }
    }

    /// Brings the registry in line with `targets`.
    pub async fn reconcile(&mut self, targets: Vec<Target>) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut seen: HashSet<Arc<str>> = HashSet::with_capacity(targets.len());

        for target in targets {
            if target.is_directory() {
                warn!(target_name = %target.name, address = %target.address, "reserved target name ignored");
                continue;
            }
            if !seen.insert(target.name.clone()) {
                warn!(target_name = %target.name, address = %target.address, "duplicate target ignored");
                continue;
            }

            match self.registry.get(&target.name) {
                None => {
                    info!(target_name = %target.name, address = %target.address, "starting new probe");
                    let name = target.name.clone();
                    self.registry.spawn(target);
                    outcome.started.push(name);
                }
                Some(live) if *live == target => outcome.unchanged += 1,
                Some(live) => {
                    info!(
                        target_name = %target.name,
                        from = %live.address,
                        to = %target.address,
                        "replacing outdated probe"
                    );
                    let name = target.name.clone();
                    self.registry.stop(&name).await;
                    self.registry.spawn(target);
                    outcome.replaced.push(name);
                }
            }
        }

        for name in self.registry.names() {
            if seen.contains(&name) {
                continue;
            }
            info!(target_name = %name, "stopping lost probe");
            self.registry.stop(&name).await;
            outcome.removed.push(name);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, EventStream};
    use crate::probes::ProbeParams;
    use crate::testing::{ScriptedLister, ScriptedProber, targets};

    const PARAMS: ProbeParams = ProbeParams {
        interval: Duration::from_secs(15),
        timeout: Duration::from_secs(14),
    };

    struct Fixture {
        reconciler: Reconciler,
        events: EventStream,
        prober: Arc<ScriptedProber>,
        lister: Arc<ScriptedLister>,
    }

    fn fixture(script: Vec<Result<Vec<Target>, ListError>>) -> Fixture {
        let (bus, events) = Bus::channel(256);
        let prober = Arc::new(ScriptedProber::default());
        let lister = Arc::new(ScriptedLister::new(script));
        let registry = Registry::new(
            bus.clone(),
            prober.clone(),
            CancellationToken::new(),
            PARAMS,
            PARAMS.interval,
        );
        let reconciler = Reconciler::new(
            lister.clone(),
            registry,
            bus,
            Target::directory("https://api"),
            Duration::from_secs(60),
        );
        Fixture {
            reconciler,
            events,
            prober,
            lister,
        }
    }

    fn drain(events: &mut EventStream) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = events.try_recv() {
            out.push(ev);
        }
        out
    }

    fn names(list: &[Arc<str>]) -> Vec<&str> {
        list.iter().map(|n| &**n).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn first_scan_starts_every_target() {
        let mut f = fixture(vec![Ok(targets(&[
            ("n1", "1.1.1.1:7"),
            ("n2", "2.2.2.2:7"),
        ]))]);

        let outcome = f.reconciler.scan().await.unwrap();
        assert_eq!(names(&outcome.started), ["n1", "n2"]);
        assert_eq!(f.reconciler.registry().len(), 2);

        let directory: Vec<Event> = drain(&mut f.events)
            .into_iter()
            .filter(|e| e.target.is_directory())
            .collect();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory[0].kind, EventKind::Reply);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_target_is_stopped_once() {
        let mut f = fixture(vec![
            Ok(targets(&[("n1", "1.1.1.1:7"), ("n2", "2.2.2.2:7")])),
            Ok(targets(&[("n1", "1.1.1.1:7")])),
            Ok(targets(&[("n1", "1.1.1.1:7")])),
        ]);

        f.reconciler.scan().await.unwrap();
        let outcome = f.reconciler.scan().await.unwrap();
        assert_eq!(names(&outcome.removed), ["n2"]);
        assert_eq!(outcome.unchanged, 1);
        assert_eq!(f.reconciler.registry().names().len(), 1);

        let outcome = f.reconciler.scan().await.unwrap();
        assert!(outcome.is_noop());

        let retired: Vec<Event> = drain(&mut f.events)
            .into_iter()
            .filter(|e| e.kind == EventKind::Retired)
            .collect();
        assert_eq!(retired.len(), 1);
        assert_eq!(&*retired[0].target.name, "n2");
    }

    #[tokio::test(start_paused = true)]
    async fn address_change_replaces_probe_without_overlap() {
        let mut f = fixture(vec![
            Ok(targets(&[("n1", "1.1.1.1:7")])),
            Ok(targets(&[("n1", "3.3.3.3:7")])),
        ]);

        f.reconciler.scan().await.unwrap();
        tokio::task::yield_now().await;
        let outcome = f.reconciler.scan().await.unwrap();

        assert_eq!(names(&outcome.replaced), ["n1"]);
        assert!(outcome.started.is_empty() && outcome.removed.is_empty());
        assert_eq!(&*f.reconciler.registry().get("n1").unwrap().address, "3.3.3.3:7");

        time::sleep(PARAMS.interval * 3).await;

        let events = drain(&mut f.events);
        let retired_at = events
            .iter()
            .position(|e| e.kind == EventKind::Retired)
            .unwrap();
        assert_eq!(&*events[retired_at].target.address, "1.1.1.1:7");
        assert!(events[retired_at..]
            .iter()
            .filter(|e| &*e.target.name == "n1" && e.is_measurement())
            .all(|e| &*e.target.address == "3.3.3.3:7"));
        assert!(f.prober.calls("1.1.1.1:7") <= 1);
        assert!(f.prober.calls("3.3.3.3:7") >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_live_probes() {
        let mut f = fixture(vec![
            Ok(targets(&[("n1", "1.1.1.1:7")])),
            Err(ListError::Status { status: 503 }),
        ]);

        f.reconciler.scan().await.unwrap();
        assert!(f.reconciler.scan().await.is_none());
        assert_eq!(f.reconciler.registry().len(), 1);

        let directory: Vec<EventKind> = drain(&mut f.events)
            .into_iter()
            .filter(|e| e.target.is_directory())
            .map(|e| e.kind)
            .collect();
        assert_eq!(directory, [EventKind::Reply, EventKind::Lost]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_names_start_one_probe() {
        let mut f = fixture(vec![Ok(targets(&[
            ("n1", "1.1.1.1:7"),
            ("n1", "9.9.9.9:7"),
            ("n2", "2.2.2.2:7"),
        ]))]);

        let outcome = f.reconciler.scan().await.unwrap();
        assert_eq!(names(&outcome.started), ["n1", "n2"]);
        assert_eq!(&*f.reconciler.registry().get("n1").unwrap().address, "1.1.1.1:7");
    }

    #[tokio::test(start_paused = true)]
    async fn reserved_directory_name_is_not_probed() {
        let mut f = fixture(vec![
            Ok(targets(&[("API", "10.0.0.9:7"), ("n1", "1.1.1.1:7")])),
            Ok(targets(&[("API", "10.0.0.9:7")])),
        ]);

        let outcome = f.reconciler.scan().await.unwrap();
        assert_eq!(names(&outcome.started), ["n1"]);
        assert!(f.reconciler.registry().get("API").is_none());

        let outcome = f.reconciler.scan().await.unwrap();
        assert_eq!(names(&outcome.removed), ["n1"]);
        assert!(f.reconciler.registry().is_empty());

        time::sleep(PARAMS.interval).await;
        assert_eq!(f.prober.calls("10.0.0.9:7"), 0);
        let events = drain(&mut f.events);
        assert!(events
            .iter()
            .filter(|e| e.target.is_directory())
            .all(|e| &*e.target.address == "https://api" && e.kind == EventKind::Reply));
    }

    #[tokio::test(start_paused = true)]
    async fn run_scans_periodically_and_stops_probes_on_cancel() {
        let mut f = fixture(vec![
            Ok(targets(&[("n1", "1.1.1.1:7")])),
            Ok(targets(&[("n1", "1.1.1.1:7"), ("n2", "2.2.2.2:7")])),
        ]);
        let lister = f.lister.clone();
        let token = CancellationToken::new();
        let run = tokio::spawn(f.reconciler.run(token.clone()));

        time::sleep(Duration::from_secs(61)).await;
        assert_eq!(lister.calls(), 2);

        token.cancel();
        run.await.unwrap();

        let events = drain(&mut f.events);
        assert!(events
            .iter()
            .any(|e| &*e.target.name == "n2" && e.is_measurement()));
        assert!(events.iter().all(|e| e.kind != EventKind::Retired));
        assert!(f.events.recv().await.is_none());
    }
}
