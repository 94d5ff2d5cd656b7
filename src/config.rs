//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the probevisor runtime.
//! The runtime receives an already-validated `Config`; parsing of the process
//! environment lives in [`cli`](crate::cli).
//!
//! ## Sentinel values
//! - `publish_interval = 0s` → follows `probe_interval`
//! - `stop_timeout = 0s` → follows `probe_interval`

use std::net::SocketAddr;
use std::time::Duration;

/// Smallest scan/probe interval, in seconds, that the runtime accepts.
///
/// Anything below falls back to the default (see [`Config::with_scan_secs`]).
pub const MIN_INTERVAL_SECS: u64 = 2;

/// Default directory scan interval, in seconds.
pub const DEFAULT_SCAN_SECS: u64 = 60;

/// Default probe interval, in seconds.
pub const DEFAULT_PROBE_SECS: u64 = 15;

/// How per-target counters evolve across publish cycles.
///
/// The same mode applies to every entry, the directory pseudo-target included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CounterMode {
    /// Counters grow for the lifetime of a target and are dropped when the
    /// target is retired.
    #[default]
    Cumulative,
    /// Counters are reset to zero after every publish.
    Windowed,
}

/// Global configuration for the probevisor runtime.
///
/// ## Field semantics
/// - `scan_interval`: period between two directory fetches (first fetch is immediate)
/// - `probe_interval`: period between two handshake attempts of one probe
/// - `publish_interval`: period between two rendered reports (`0s` = `probe_interval`)
/// - `stop_timeout`: how long a stop waits for a probe before aborting it (`0s` = `probe_interval`)
/// - `grace`: shutdown budget for all components
/// - `event_capacity`: bound of the measurement channel (min 1)
/// - `listen`: address of the report endpoint
/// - `metric_prefix`: prefix of the exported metric families
/// - `directory`: label (address) of the directory pseudo-target
/// - `counters`: counter semantics across publishes
#[derive(Clone, Debug)]
pub struct Config {
    /// Period between two directory fetches.
    pub scan_interval: Duration,
    /// Period between two probe attempts.
    pub probe_interval: Duration,
    /// Period between two published reports.
    pub publish_interval: Duration,
    /// Maximum wait for a cancelled probe to acknowledge.
    pub stop_timeout: Duration,
    /// Maximum wait for all components on shutdown.
    pub grace: Duration,
    /// Capacity of the measurement channel.
    pub event_capacity: usize,
    /// Report endpoint address.
    pub listen: SocketAddr,
    /// Metric family prefix (`<prefix>_reply`, `<prefix>_lost`, `<prefix>_time`).
    pub metric_prefix: String,
    /// Address label of the directory pseudo-target.
    pub directory: String,
    /// Counter semantics.
    pub counters: CounterMode,
}

impl Config {
    /// Sets the scan interval from seconds, falling back to the default below
    /// [`MIN_INTERVAL_SECS`].
    pub fn with_scan_secs(mut self, secs: u64) -> Self {
        self.scan_interval = Duration::from_secs(interval_or(secs, DEFAULT_SCAN_SECS));
        self
    }

    /// Sets the probe interval from seconds, falling back to the default below
    /// [`MIN_INTERVAL_SECS`].
    pub fn with_probe_secs(mut self, secs: u64) -> Self {
        self.probe_interval = Duration::from_secs(interval_or(secs, DEFAULT_PROBE_SECS));
        self
    }

    /// Timeout of one handshake attempt.
    ///
    /// One second less than the probe interval so an attempt always finishes
    /// before the next tick; intervals shorter than two seconds use half the
    /// interval instead.
    #[inline]
    pub fn probe_timeout(&self) -> Duration {
        let unit = Duration::from_secs(1);
        if self.probe_interval > unit {
            self.probe_interval - unit
        } else {
            self.probe_interval / 2
        }
    }

    /// Effective publish period.
    #[inline]
    pub fn publish_every(&self) -> Duration {
        if self.publish_interval == Duration::ZERO {
            self.probe_interval
        } else {
            self.publish_interval
        }
    }

    /// Effective stop deadline for a cancelled probe.
    #[inline]
    pub fn stop_deadline(&self) -> Duration {
        if self.stop_timeout == Duration::ZERO {
            self.probe_interval
        } else {
            self.stop_timeout
        }
    }

    /// Returns a channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn event_capacity_clamped(&self) -> usize {
        self.event_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `scan_interval = 60s`, `probe_interval = 15s`
    /// - `publish_interval = 0s` (follows probe interval)
    /// - `stop_timeout = 0s` (follows probe interval)
    /// - `grace = 10s`
    /// - `event_capacity = 32`
    /// - `listen = 0.0.0.0:8080`
    /// - `metric_prefix = "probevisor"`
    /// - `counters = CounterMode::Cumulative`
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(DEFAULT_SCAN_SECS),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_SECS),
            publish_interval: Duration::ZERO,
            stop_timeout: Duration::ZERO,
            grace: Duration::from_secs(10),
            event_capacity: 32,
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            metric_prefix: "probevisor".to_string(),
            directory: String::new(),
            counters: CounterMode::default(),
        }
    }
}

fn interval_or(secs: u64, default: u64) -> u64 {
    if secs < MIN_INTERVAL_SECS {
        default
    } else {
        secs
    }
}
