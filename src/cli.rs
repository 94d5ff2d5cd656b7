//! Command line and environment configuration of the `probevisor` binary.
//!
//! Every flag can also be given through its `PROBEVISOR_*` environment
//! variable. Interval values are parsed leniently: anything that is not an
//! integer of at least [`MIN_INTERVAL_SECS`](crate::MIN_INTERVAL_SECS)
//! falls back to the default instead of failing.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

use crate::config::{Config, CounterMode, DEFAULT_PROBE_SECS, DEFAULT_SCAN_SECS};
use crate::directory::KubeSettings;

#[derive(Parser, Debug)]
#[clap(name = "probevisor", version, about = "TCP reachability exporter for cluster nodes")]
pub struct Args {
    /// Base URL of the Kubernetes API server
    #[clap(long, env = "PROBEVISOR_API")]
    pub api: String,

    /// Bearer token used to list nodes
    #[clap(long, env = "PROBEVISOR_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Seconds between two node list fetches
    #[clap(long, env = "PROBEVISOR_SCAN", default_value_t = DEFAULT_SCAN_SECS, value_parser = lenient_secs)]
    pub scan: u64,

    /// Seconds between two handshakes with one node
    #[clap(long, env = "PROBEVISOR_PROBE", default_value_t = DEFAULT_PROBE_SECS, value_parser = lenient_secs)]
    pub probe: u64,

    /// Address of the report endpoint
    #[clap(long, env = "PROBEVISOR_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// How counters evolve across reports
    #[clap(long, env = "PROBEVISOR_COUNTERS", value_enum, default_value_t = Counters::Cumulative)]
    pub counters: Counters,

    /// Skip TLS certificate verification of the API server
    #[clap(long, env = "PROBEVISOR_INSECURE")]
    pub insecure: bool,
}

/// Counter semantics selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Counters {
    /// Counters grow until the node disappears
    Cumulative,
    /// Counters restart from zero after every report
    Windowed,
}

impl From<Counters> for CounterMode {
    fn from(c: Counters) -> Self {
        match c {
            Counters::Cumulative => CounterMode::Cumulative,
            Counters::Windowed => CounterMode::Windowed,
        }
    }
}

impl Args {
    /// Splits the arguments into runtime configuration and lister settings.
    pub fn into_settings(self) -> (Config, KubeSettings) {
        let mut cfg = Config::default()
            .with_scan_secs(self.scan)
            .with_probe_secs(self.probe);
        cfg.listen = self.listen;
        cfg.counters = self.counters.into();
        cfg.directory = self.api.clone();

        let kube = KubeSettings {
            api: self.api,
            token: self.token,
            insecure: self.insecure,
            timeout: cfg.scan_interval,
        };
        (cfg, kube)
    }
}

// Unparseable input maps to 0, which `Config` replaces with the default.
fn lenient_secs(s: &str) -> Result<u64, String> {
    Ok(s.trim().parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["probevisor", "--api", "https://k8s:6443", "--token", "t0k"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let (cfg, kube) = parse(&[]).into_settings();
        assert_eq!(cfg.scan_interval, Duration::from_secs(60));
        assert_eq!(cfg.probe_interval, Duration::from_secs(15));
        assert_eq!(cfg.listen, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.counters, CounterMode::Cumulative);
        assert_eq!(cfg.directory, "https://k8s:6443");

        assert_eq!(kube.api, "https://k8s:6443");
        assert_eq!(kube.token, "t0k");
        assert!(!kube.insecure);
        assert_eq!(kube.timeout, Duration::from_secs(60));
    }

    #[test]
    fn bad_or_short_intervals_fall_back() {
        let (cfg, _) = parse(&["--scan", "soon", "--probe", "1"]).into_settings();
        assert_eq!(cfg.scan_interval, Duration::from_secs(60));
        assert_eq!(cfg.probe_interval, Duration::from_secs(15));

        let (cfg, kube) = parse(&["--scan", "30", "--probe", "5"]).into_settings();
        assert_eq!(cfg.scan_interval, Duration::from_secs(30));
        assert_eq!(cfg.probe_interval, Duration::from_secs(5));
        assert_eq!(kube.timeout, Duration::from_secs(30));
    }

    #[test]
    fn windowed_counters_and_insecure() {
        let (cfg, kube) = parse(&["--counters", "windowed", "--insecure"]).into_settings();
        assert_eq!(cfg.counters, CounterMode::Windowed);
        assert!(kube.insecure);
    }

    #[test]
    fn api_and_token_are_required() {
        assert!(Args::try_parse_from(["probevisor", "--api", "https://k8s"]).is_err());
    }
}
