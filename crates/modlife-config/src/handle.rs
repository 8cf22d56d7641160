//! Live configuration shared between the kernel and its collaborators.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::schema::KernelConfig;

/// Shared, swappable kernel configuration.
///
/// Clones refer to the same configuration. Replacing the configuration does
/// not touch running services; it takes effect the next time declarations
/// are read, typically from a restart callback.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<KernelConfig>>,
}

impl ConfigHandle {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> KernelConfig {
        self.inner.read().clone()
    }

    /// Run `f` with read access to the current configuration.
    pub fn read<R>(&self, f: impl FnOnce(&KernelConfig) -> R) -> R {
        f(&self.inner.read())
    }

    /// Replace the configuration, returning the previous one.
    pub fn replace(&self, config: KernelConfig) -> KernelConfig {
        std::mem::replace(&mut *self.inner.write(), config)
    }

    /// Modify the configuration in place.
    pub fn update(&self, f: impl FnOnce(&mut KernelConfig)) {
        f(&mut self.inner.write());
    }
}

impl From<KernelConfig> for ConfigHandle {
    fn from(config: KernelConfig) -> Self {
        Self::new(config)
    }
}
