//! # Probe target.
//!
//! A [`Target`] is a named, addressable host. Identity is the `name`; the
//! `address` may change between two directory fetches, in which case the
//! reconciler replaces the probe instead of mutating it.

use std::fmt;
use std::sync::Arc;

/// Name of the pseudo-target that carries directory-fetch health.
pub const DIRECTORY_TARGET: &str = "API";

/// A named host to probe.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    /// Stable identity.
    pub name: Arc<str>,
    /// `host:port` to dial.
    pub address: Arc<str>,
}

impl Target {
    /// Creates a new target.
    pub fn new(name: impl Into<Arc<str>>, address: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Pseudo-target for the directory itself, labelled with its endpoint.
    pub fn directory(endpoint: impl Into<Arc<str>>) -> Self {
        Self::new(DIRECTORY_TARGET, endpoint)
    }

    /// True for the directory pseudo-target.
    #[inline]
    pub fn is_directory(&self) -> bool {
        &*self.name == DIRECTORY_TARGET
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.address)
    }
}
