//! Test doubles shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::directory::{Target, TargetLister};
use crate::error::{ListError, ProbeError};
use crate::probes::Prober;

/// Latency of a successful scripted handshake.
pub(crate) const SCRIPTED_LATENCY: Duration = Duration::from_millis(5);

/// Prober whose outcome depends on the address:
/// - `hang...` never completes
/// - `down...` is refused immediately
/// - anything else succeeds after [`SCRIPTED_LATENCY`]
#[derive(Default)]
pub(crate) struct ScriptedProber {
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProber {
    pub(crate) fn calls(&self, address: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str) -> Result<(), ProbeError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default() += 1;

        if address.starts_with("hang") {
            std::future::pending::<()>().await;
        }
        if address.starts_with("down") {
            return Err(ProbeError::Connect {
                error: "connection refused".into(),
            });
        }
        tokio::time::sleep(SCRIPTED_LATENCY).await;
        Ok(())
    }
}

/// Lister that replays a fixed sequence of answers, then fails.
#[derive(Default)]
pub(crate) struct ScriptedLister {
    script: Mutex<VecDeque<Result<Vec<Target>, ListError>>>,
    calls: AtomicUsize,
}

impl ScriptedLister {
    pub(crate) fn new(script: Vec<Result<Vec<Target>, ListError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetLister for ScriptedLister {
    async fn list(&self) -> Result<Vec<Target>, ListError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ListError::Request {
                    error: "script exhausted".into(),
                })
            })
    }
}

/// Builds targets from `(name, address)` pairs.
pub(crate) fn targets(pairs: &[(&str, &str)]) -> Vec<Target> {
    pairs
        .iter()
        .map(|(name, address)| Target::new(*name, *address))
        .collect()
}
