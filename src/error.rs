//! Error types used by the probevisor runtime, probes and directory listers.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: startup/configuration failures and shutdown overruns.
//! - [`ProbeError`]: a single failed handshake attempt.
//! - [`ListError`]: a failed directory fetch.
//!
//! Only [`RuntimeError`] ever leaves the runtime. Probe and list errors are
//! turned into `lost` counters and log lines by the task that observed them.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the probevisor runtime.
///
/// `InvalidEndpoint`, `HttpClient` and `Bind` are configuration-class failures
/// detected during startup; the others end a running supervisor. The binary
/// exits on any of them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Directory endpoint could not be parsed as a URL.
    #[error("invalid directory endpoint {endpoint:?}: {error}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Parser message.
        error: String,
    },

    /// HTTP client for the directory could not be constructed.
    #[error("failed to build directory client: {error}")]
    HttpClient {
        /// Underlying error message.
        error: String,
    },

    /// Report listener could not bind its address.
    #[error("failed to bind report listener on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// Report server stopped with an I/O error.
    #[error("report server failed: {source}")]
    Serve {
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// A long-lived component stopped before shutdown was requested, or panicked.
    #[error("component {name} terminated: {reason}")]
    ComponentFailed {
        /// Component name (`reconciler`, `aggregator`, `server`).
        name: String,
        /// What ended it.
        reason: String,
    },

    /// Shutdown grace period was exceeded; some components did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Components that did not finish in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use probevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidEndpoint { .. } => "runtime_invalid_endpoint",
            RuntimeError::HttpClient { .. } => "runtime_http_client",
            RuntimeError::Bind { .. } => "runtime_bind",
            RuntimeError::Serve { .. } => "runtime_serve",
            RuntimeError::ComponentFailed { .. } => "runtime_component_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::InvalidEndpoint { endpoint, error } => {
                format!("endpoint {endpoint:?} rejected: {error}")
            }
            RuntimeError::HttpClient { error } => format!("http client: {error}"),
            RuntimeError::Bind { addr, source } => format!("bind {addr}: {source}"),
            RuntimeError::Serve { source } => format!("serve: {source}"),
            RuntimeError::ComponentFailed { name, reason } => format!("{name}: {reason}"),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck={stuck:?}")
            }
        }
    }
}

/// # Errors produced by one probe attempt.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Handshake did not complete within the attempt timeout.
    #[error("handshake timed out after {timeout:?}")]
    Timeout {
        /// The attempt timeout that was exceeded.
        timeout: Duration,
    },

    /// Handshake failed (refused, unreachable, unresolvable address...).
    #[error("handshake failed: {error}")]
    Connect {
        /// The underlying error message.
        error: String,
    },
}

impl ProbeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use probevisor::ProbeError;
    /// use std::time::Duration;
    ///
    /// let err = ProbeError::Timeout { timeout: Duration::from_secs(14) };
    /// assert_eq!(err.as_label(), "probe_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProbeError::Timeout { .. } => "probe_timeout",
            ProbeError::Connect { .. } => "probe_connect",
        }
    }

    /// True if the attempt was cut short by its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. })
    }
}

/// # Errors produced by a directory fetch.
///
/// The runtime treats every variant the same way (one `lost` for the
/// directory pseudo-target); the split exists for logs.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ListError {
    /// Request could not be sent or the connection failed.
    #[error("directory request failed: {error}")]
    Request {
        /// The underlying error message.
        error: String,
    },

    /// Directory answered with something other than `200 OK`.
    #[error("directory replied with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Body could not be decoded into a target list.
    #[error("directory reply could not be decoded: {error}")]
    Decode {
        /// The underlying error message.
        error: String,
    },
}

impl ListError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ListError::Request { .. } => "list_request",
            ListError::Status { .. } => "list_status",
            ListError::Decode { .. } => "list_decode",
        }
    }
}
