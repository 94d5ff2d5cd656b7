//! # Probing.
//!
//! - [`Prober`] - one handshake against an address
//! - [`TcpProber`] - TCP connect/close prober used by default
//! - [`ProbeTask`] - per-target loop publishing one measurement per attempt

mod prober;
mod task;

pub use prober::{Prober, ProberRef, TcpProber};
pub use task::{ProbeExit, ProbeParams, ProbeTask};
