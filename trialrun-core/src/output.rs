//! Output Path Registry
//!
//! Process-wide home of the single mutable setting every artifact writer
//! consults: the running experiment's output directory. One instance is
//! constructed per process and shared by reference (or `Arc`) with every
//! collaborator, rather than enforced through hidden global state.
//!
//! Ordering contract: the controller sets the path before any run starts;
//! collaborators read it only afterwards. Under that sequencing the inner
//! lock is never contended, it merely makes the registry `Sync`.

use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

/// Shared registry for the running experiment's output directory.
#[derive(Debug, Default)]
pub struct OutputPathRegistry {
    path: RwLock<Option<PathBuf>>,
}

impl OutputPathRegistry {
    /// Create a registry with no path set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the experiment output path, overwriting any previous value.
    ///
    /// Called once per experiment, before the first run begins. There is
    /// no history; a new experiment in the same process simply overwrites.
    pub fn set_experiment_output_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "experiment output path set");
        let mut guard = match self.path.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(path);
    }

    /// The experiment output path, or `None` before the first set.
    pub fn experiment_output_path(&self) -> Option<PathBuf> {
        let guard = match self.path.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_registry_returns_none() {
        let registry = OutputPathRegistry::new();
        assert_eq!(registry.experiment_output_path(), None);
    }

    #[test]
    fn set_then_get() {
        let registry = OutputPathRegistry::new();
        registry.set_experiment_output_path("/tmp/exp");
        assert_eq!(
            registry.experiment_output_path(),
            Some(PathBuf::from("/tmp/exp"))
        );
    }

    #[test]
    fn set_overwrites_without_history() {
        let registry = OutputPathRegistry::new();
        registry.set_experiment_output_path("/tmp/first");
        registry.set_experiment_output_path("/tmp/second");
        assert_eq!(
            registry.experiment_output_path(),
            Some(PathBuf::from("/tmp/second"))
        );
    }
}
