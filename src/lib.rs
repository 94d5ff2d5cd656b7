//! # probevisor
//!
//! **Probevisor** keeps one TCP handshake probe per cluster node and exposes
//! reply/lost/latency counters for every node in the Prometheus text format.
//!
//! The node list is fetched periodically from a directory (the Kubernetes
//! API by default); probes are started, replaced and retired so that exactly
//! one probe runs per listed node. The directory itself is measured too and
//! reported under the pseudo-target `API`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                      ┌────────────────────┐
//!                      │    TargetLister    │  (KubeNodeLister: GET /api/v1/nodes/)
//!                      └─────────┬──────────┘
//!                                ▼ every scan_interval
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Reconciler                                                       │
//! │  - measures the fetch itself          ─► Reply/Lost("API")        │
//! │  - diffs the list against the Registry                            │
//! │      new name      ─► spawn                                       │
//! │      new address   ─► stop (bounded) ─► Retired ─► spawn          │
//! │      gone          ─► stop (bounded) ─► Retired                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────┬───┘
//!        ▼                  ▼                  ▼                  │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//!     │  ProbeTask   │   │  ProbeTask   │   │  ProbeTask   │      │
//!     │ (node n1)    │   │ (node n2)    │   │ (node nN)    │      │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘      │
//!      │ Reply / Lost     │ Reply / Lost     │ Reply / Lost       │
//!      ▼                  ▼                  ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (bounded mpsc channel)                    │
//! │                  (capacity: Config::event_capacity)               │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │       Aggregator       │  Snapshot (per-name counters)
//!                       └───────────┬────────────┘
//!                                   ▼ every publish interval: render
//!                       ┌────────────────────────┐
//!                       │       Publisher        │  last rendered report
//!                       └───────────┬────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │      ReportServer      │  GET /metrics
//!                       └────────────────────────┘
//! ```
//!
//! ### Probe lifecycle
//! ```text
//! Reconciler ──► Registry::spawn ──► ProbeTask::run(child_token)
//!
//! loop {
//!   ├─► wait for tick (immediate first time; cancellable)
//!   ├─► handshake bounded by timeout (interval - 1s)
//!   │       ├─ Ok  ──► Reply{ latency_ms }
//!   │       └─ Err ──► Lost{ reason }
//!   ├─► cancelled meanwhile? ─► discard, exit
//!   └─► publish
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                     |
//! |-------------------|----------------------------------------------------------|----------------------------------------|
//! | **Discovery**     | Pluggable target source, Kubernetes nodes by default.    | [`TargetLister`], [`KubeNodeLister`]   |
//! | **Probing**       | Pluggable handshake, TCP connect by default.             | [`Prober`], [`TcpProber`]              |
//! | **Supervision**   | Reconcile, aggregate, serve and shut down gracefully.    | [`Supervisor`]                         |
//! | **Reporting**     | Counters and exposition text.                            | [`Snapshot`], [`render`], [`Publisher`]|
//! | **Errors**        | Typed errors for startup, probing and listing.           | [`RuntimeError`], [`ProbeError`], [`ListError`] |
//! | **Configuration** | Centralize runtime settings.                             | [`Config`], [`CounterMode`]            |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use probevisor::{Config, ListError, Supervisor, Target, TargetLister};
//!
//! struct Static;
//!
//! #[async_trait]
//! impl TargetLister for Static {
//!     async fn list(&self) -> Result<Vec<Target>, ListError> {
//!         Ok(vec![Target::new("local", "127.0.0.1:1")])
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default().with_probe_secs(2);
//!     cfg.listen = "127.0.0.1:0".parse()?;
//!
//!     let sup = Supervisor::builder(cfg, Arc::new(Static)).build();
//!     sup.run_until(tokio::time::sleep(Duration::from_millis(100))).await?;
//!
//!     let report = sup.publisher().read().await;
//!     assert!(String::from_utf8_lossy(&report).contains("name=\"local\""));
//!     Ok(())
//! }
//! ```

pub mod cli;
mod config;
pub mod core;
mod directory;
mod error;
mod events;
mod probes;
mod report;
mod server;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::{
    Config, CounterMode, DEFAULT_PROBE_SECS, DEFAULT_SCAN_SECS, MIN_INTERVAL_SECS,
};
pub use core::{Supervisor, SupervisorBuilder};
pub use directory::{DIRECTORY_TARGET, KubeNodeLister, KubeSettings, Target, TargetLister};
pub use error::{ListError, ProbeError, RuntimeError};
pub use events::{Bus, Event, EventKind, EventStream};
pub use probes::{ProbeExit, ProbeParams, ProbeTask, Prober, ProberRef, TcpProber};
pub use report::{CONTENT_TYPE, Counters, Entry, Publisher, Snapshot, render};
pub use server::ReportServer;
