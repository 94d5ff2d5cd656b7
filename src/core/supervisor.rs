//! # Supervisor: wires the pipeline and owns its lifecycle.
//!
//! The [`Supervisor`] binds the report endpoint, creates the measurement
//! channel, spawns the three long-lived components and drives graceful
//! shutdown.
//!
//! ## High-level architecture
//! ```text
//! run_until(shutdown):
//!   ReportServer::bind(cfg.listen)          (fatal on failure, nothing spawned yet)
//!   runtime_token = CancellationToken::new()
//!   (Bus, EventStream) = Bus::channel(cfg.event_capacity)
//!
//! Spawn components:
//!   reconciler ── Registry ── ProbeTask × N ──┐
//!        │                                     │ Reply / Lost / Retired
//!        └──── directory Reply / Lost ─────────┤
//!                                              ▼
//!                                          aggregator ──► Publisher ◄── server (GET /metrics)
//!
//! Shutdown path:
//!   shutdown future fires (or any component ends early)
//!     └─► runtime_token.cancel()           → propagates to every probe token
//!     └─► wait for components (≤ cfg.grace)
//!            ├─ all joined   → Ok(())
//!            └─ overrun      → RuntimeError::GraceExceeded { stuck }
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use probevisor::{Config, KubeNodeLister, KubeSettings, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default().with_probe_secs(10);
//!     cfg.directory = "https://10.0.0.1:6443".into();
//!
//!     let lister = KubeNodeLister::new(KubeSettings {
//!         api: cfg.directory.clone(),
//!         token: "secret".into(),
//!         insecure: true,
//!         timeout: cfg.scan_interval,
//!     })?;
//!
//!     Supervisor::builder(cfg, Arc::new(lister)).build().run().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::core::{
    aggregator::Aggregator, builder::SupervisorBuilder, reconciler::Reconciler,
    registry::Registry, shutdown,
};
use crate::directory::{Target, TargetLister};
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::probes::{ProbeParams, ProberRef};
use crate::report::Publisher;
use crate::server::ReportServer;

/// Shortest period handed to a ticker; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

type Component = (&'static str, JoinHandle<Result<(), RuntimeError>>);

/// Coordinates the reconciler, the aggregator and the report endpoint.
pub struct Supervisor {
    cfg: Config,
    lister: Arc<dyn TargetLister>,
    prober: ProberRef,
    publisher: Publisher,
}

impl Supervisor {
    /// Starts building a supervisor around `lister`.
    pub fn builder(cfg: Config, lister: Arc<dyn TargetLister>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, lister)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        lister: Arc<dyn TargetLister>,
        prober: ProberRef,
    ) -> Self {
        Self {
            cfg,
            lister,
            prober,
            publisher: Publisher::new(),
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Handle to the latest published report.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Runs until a termination signal arrives.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        self.run_until(async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => info!(signal, "shutdown requested"),
                Err(e) => {
                    warn!(error = %e, "signal handlers unavailable; falling back to ctrl-c");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        })
        .await
    }

    /// Runs until `shutdown` completes or any component ends on its own.
    ///
    /// Returns [`RuntimeError::Bind`] before anything is spawned if the listen
    /// address is unusable. A component that exits or panics before shutdown
    /// cancels the others and is reported as [`RuntimeError::ComponentFailed`]
    /// (or its own error, for the server).
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        let server = ReportServer::bind(self.cfg.listen, self.publisher.clone()).await?;
        let token = CancellationToken::new();

        let (reconciler, aggregator) = self.components(token.clone());
        let serve = tokio::spawn(server.serve(token.clone()));
        let reconcile = tokio::spawn({
            let token = token.clone();
            async move {
                reconciler.run(token).await;
                Ok(())
            }
        });
        let collect = tokio::spawn({
            let token = token.clone();
            async move {
                aggregator.run(token).await;
                Ok(())
            }
        });

        let mut components: Vec<Component> = vec![
            ("reconciler", reconcile),
            ("aggregator", collect),
            ("server", serve),
        ];
        let early = select! {
            _ = shutdown => None,
            (res, idx, _) = future::select_all(components.iter_mut().map(|(_, join)| join)) => {
                Some((idx, res))
            }
        };
        token.cancel();

        let failed = early.map(|(idx, res)| {
            let (name, _) = components.remove(idx);
            let err = Self::component_result(name, res).unwrap_or_else(|| {
                RuntimeError::ComponentFailed {
                    name: name.to_string(),
                    reason: "exited before shutdown".to_string(),
                }
            });
            error!(component = name, error = %err, "component ended early; shutting down");
            err
        });

        let waited = self.wait_all_with_grace(components).await;
        match (failed, waited) {
            (_, Err(e @ RuntimeError::GraceExceeded { .. })) => Err(e),
            (Some(e), _) => Err(e),
            (None, res) => res,
        }
    }

    /// Builds the reconciler (with its registry) and the aggregator.
    fn components(&self, token: CancellationToken) -> (Reconciler, Aggregator) {
        let cfg = &self.cfg;
        let (bus, events) = Bus::channel(cfg.event_capacity_clamped());

        let params = ProbeParams {
            interval: cfg.probe_interval.max(MIN_PERIOD),
            timeout: cfg.probe_timeout(),
        };
        let registry = Registry::new(
            bus.clone(),
            Arc::clone(&self.prober),
            token,
            params,
            cfg.stop_deadline(),
        );
        let reconciler = Reconciler::new(
            Arc::clone(&self.lister),
            registry,
            bus,
            Target::directory(cfg.directory.as_str()),
            cfg.scan_interval.max(MIN_PERIOD),
        );
        let aggregator = Aggregator::new(
            events,
            self.publisher.clone(),
            cfg.metric_prefix.as_str(),
            cfg.publish_every().max(MIN_PERIOD),
            cfg.counters,
        );

        info!(
            scan = ?cfg.scan_interval,
            probe = ?params.interval,
            timeout = ?params.timeout,
            listen = %cfg.listen,
            "probevisor start"
        );
        (reconciler, aggregator)
    }

    /// Waits for every component within the configured grace period.
    ///
    /// Components still running at the deadline are aborted and reported in
    /// [`RuntimeError::GraceExceeded`]; otherwise the first component error,
    /// if any, is returned.
    async fn wait_all_with_grace(&self, components: Vec<Component>) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let deadline = Instant::now() + grace;
        let mut stuck = Vec::new();
        let mut failed = None;

        for (name, mut join) in components {
            match time::timeout_at(deadline, &mut join).await {
                Ok(res) => {
                    if let Some(e) = Self::component_result(name, res) {
                        failed.get_or_insert(e);
                    }
                }
                Err(_elapsed) => {
                    join.abort();
                    stuck.push(name.to_string());
                }
            }
        }

        if !stuck.is_empty() {
            warn!(?grace, ?stuck, "grace exceeded");
            return Err(RuntimeError::GraceExceeded { grace, stuck });
        }
        info!("all components stopped");
        failed.map_or(Ok(()), Err)
    }

    fn component_result(
        name: &'static str,
        res: Result<Result<(), RuntimeError>, tokio::task::JoinError>,
    ) -> Option<RuntimeError> {
        match res {
            Ok(Ok(())) => {
                debug!(component = name, "component stopped");
                None
            }
            Ok(Err(e)) => {
                error!(component = name, label = e.as_label(), error = %e, "component failed");
                Some(e)
            }
            Err(e) => {
                error!(component = name, error = %e, "component panicked");
                Some(RuntimeError::ComponentFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CounterMode;
    use crate::error::ListError;
    use crate::testing::{ScriptedLister, ScriptedProber, targets};

    fn config() -> Config {
        Config {
            listen: "127.0.0.1:0".parse().unwrap(),
            metric_prefix: "pv".into(),
            directory: "https://api".into(),
            grace: Duration::from_secs(5),
            counters: CounterMode::Cumulative,
            ..Config::default()
        }
    }

    fn supervisor(cfg: Config, lister: ScriptedLister) -> Supervisor {
        Supervisor::builder(cfg, Arc::new(lister))
            .with_prober(Arc::new(ScriptedProber::default()))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn probes_listed_targets_and_publishes_final_report() {
        let lister = ScriptedLister::new(vec![Ok(targets(&[
            ("n1", "10.0.0.1:7"),
            ("n2", "down:7"),
        ]))]);
        let sup = supervisor(config(), lister);

        sup.run_until(time::sleep(Duration::from_secs(20)))
            .await
            .unwrap();

        let report = String::from_utf8(sup.publisher().read().await.to_vec()).unwrap();
        assert!(report.contains("pv_reply{name=\"n1\",target=\"10.0.0.1:7\"} 2"));
        assert!(report.contains("pv_lost{name=\"n2\",target=\"down:7\"} 2"));
        assert!(report.contains("pv_reply{name=\"API\",target=\"https://api\"} 1"));
        assert!(report.contains("pv_lost{name=\"API\",target=\"https://api\"} 0"));
    }

    #[tokio::test]
    async fn unusable_listen_address_fails_before_spawning() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cfg = Config {
            listen: taken.local_addr().unwrap(),
            ..config()
        };
        let lister = Arc::new(ScriptedLister::new(vec![]));
        let sup = Supervisor::builder(cfg, lister.clone())
            .with_prober(Arc::new(ScriptedProber::default()))
            .build();

        let err = sup.run_until(std::future::pending()).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_bind");
        assert_eq!(lister.calls(), 0);
    }

    struct PanickingLister;

    #[async_trait::async_trait]
    impl TargetLister for PanickingLister {
        async fn list(&self) -> Result<Vec<Target>, ListError> {
            panic!("lister blew up")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicked_component_ends_the_run_with_an_error() {
        let sup = Supervisor::builder(config(), Arc::new(PanickingLister))
            .with_prober(Arc::new(ScriptedProber::default()))
            .build();

        let started = Instant::now();
        let err = sup
            .run_until(time::sleep(Duration::from_secs(600)))
            .await
            .unwrap_err();
        assert!(Instant::now() - started < Duration::from_secs(600));

        match err {
            RuntimeError::ComponentFailed { name, reason } => {
                assert_eq!(name, "reconciler");
                assert!(reason.contains("panicked"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let report = String::from_utf8(sup.publisher().read().await.to_vec()).unwrap();
        assert!(report.contains("# TYPE pv_reply counter"));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_components_exceed_grace() {
        let lister = ScriptedLister::new(vec![Ok(targets(&[("n1", "hang:7")]))]);
        let cfg = Config {
            grace: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(30),
            ..config()
        };
        let sup = supervisor(cfg, lister);

        let err = sup
            .run_until(time::sleep(Duration::from_secs(1)))
            .await
            .unwrap_err();
        match err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_secs(1));
                assert_eq!(stuck, vec!["reconciler".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
