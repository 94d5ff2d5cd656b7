//! # Handshake primitive.
//!
//! [`Prober`] performs one reachability check against an address. The
//! [`ProbeTask`](crate::probes::ProbeTask) owns the schedule and the attempt
//! timeout; a prober only dials.
//!
//! [`TcpProber`] completes a TCP three-way handshake and closes the stream
//! right away, so the target sees a connect/close pair and nothing else.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::ProbeError;

/// Shared handle to a prober.
pub type ProberRef = Arc<dyn Prober>;

/// # One reachability check.
///
/// Implementations may take arbitrarily long; the caller bounds every attempt
/// with its own timeout and drops the future when it expires.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use probevisor::{ProbeError, Prober};
///
/// struct AlwaysUp;
///
/// #[async_trait]
/// impl Prober for AlwaysUp {
///     async fn probe(&self, _address: &str) -> Result<(), ProbeError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Attempts one handshake with `address` (`host:port`).
    async fn probe(&self, address: &str) -> Result<(), ProbeError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// TCP connect prober.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpProber;

impl TcpProber {
    /// Creates the prober as a shared handle.
    pub fn arc() -> ProberRef {
        Arc::new(Self)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &str) -> Result<(), ProbeError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| ProbeError::Connect {
                error: e.to_string(),
            })?;
        drop(stream);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}
