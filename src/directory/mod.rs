//! # Target discovery.
//!
//! - [`Target`] - named host to probe (identity is the name)
//! - [`TargetLister`] - pluggable source of the current target list
//! - [`KubeNodeLister`] - default lister backed by the Kubernetes nodes API

mod kube;
mod lister;
mod target;

pub use kube::{KubeNodeLister, KubeSettings};
pub use lister::TargetLister;
pub use target::{DIRECTORY_TARGET, Target};
