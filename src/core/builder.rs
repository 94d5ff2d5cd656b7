use std::sync::Arc;

use crate::config::Config;
use crate::directory::TargetLister;
use crate::probes::{ProberRef, TcpProber};

use super::supervisor::Supervisor;

/// Builder for constructing a [`Supervisor`] with optional parts.
///
/// The target lister is mandatory; the prober defaults to [`TcpProber`].
pub struct SupervisorBuilder {
    cfg: Config,
    lister: Arc<dyn TargetLister>,
    prober: Option<ProberRef>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and lister.
    pub fn new(cfg: Config, lister: Arc<dyn TargetLister>) -> Self {
        Self {
            cfg,
            lister,
            prober: None,
        }
    }

    /// Replaces the handshake implementation used by every probe.
    pub fn with_prober(mut self, prober: ProberRef) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Builds the supervisor. Nothing is bound or spawned until it runs.
    pub fn build(self) -> Supervisor {
        let prober = self.prober.unwrap_or_else(TcpProber::arc);
        Supervisor::new_internal(self.cfg, self.lister, prober)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLister;

    #[test]
    fn build_keeps_config() {
        let cfg = Config::default().with_probe_secs(5);
        let sup = SupervisorBuilder::new(cfg, Arc::new(ScriptedLister::default())).build();
        assert_eq!(sup.config().probe_interval, std::time::Duration::from_secs(5));
    }
}
