//! Runtime core: orchestration and lifecycle.
//!
//! The public entry point is [`Supervisor`], which wires the pipeline and
//! drives graceful shutdown. The building blocks are public as well so they
//! can be driven individually.
//!
//! Internal modules:
//! - [`registry`]: live probe handles by name, bounded stop;
//! - [`reconciler`]: periodic directory scan and registry diff;
//! - [`aggregator`]: folds events into counters and publishes reports;
//! - [`supervisor`]: spawns components, handles shutdown and grace;
//! - [`shutdown`]: cross-platform shutdown signal handling.

pub mod aggregator;
mod builder;
pub mod reconciler;
pub mod registry;
mod shutdown;
pub mod supervisor;

pub use aggregator::Aggregator;
pub use builder::SupervisorBuilder;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use registry::{Registry, StopOutcome};
pub use supervisor::Supervisor;
