//! # Target lister contract.
//!
//! [`TargetLister`] is the only thing the reconciler knows about the
//! directory. It is called once per scan; the runtime does not inspect the
//! error beyond logging it.

use async_trait::async_trait;

use crate::directory::Target;
use crate::error::ListError;

/// Source of the current target list.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use probevisor::{ListError, Target, TargetLister};
///
/// struct Fixed;
///
/// #[async_trait]
/// impl TargetLister for Fixed {
///     async fn list(&self) -> Result<Vec<Target>, ListError> {
///         Ok(vec![Target::new("n1", "10.0.0.1:10250")])
///     }
/// }
/// ```
#[async_trait]
pub trait TargetLister: Send + Sync + 'static {
    /// Fetches the current, ordered list of targets.
    async fn list(&self) -> Result<Vec<Target>, ListError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
