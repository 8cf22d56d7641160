//! Context handed to service factories and hooks.

use std::sync::Arc;

use super::traits::downcast_instance;
use super::Service;
use crate::error::LifecycleError;
use crate::ServiceKey;

/// Kernel access for code running inside a service hook.
///
/// Calls are reentrant: a startup hook may look up or start other services
/// while its own startup is still in progress.
pub trait ServiceLookup: Send + Sync {
    /// Whether an instance of the service exists.
    fn is_active(&self, key: &ServiceKey) -> bool;

    /// The instance of an active service.
    fn instance(&self, key: &ServiceKey) -> Result<Arc<dyn Service>, LifecycleError>;

    /// Start a service with all its dependencies.
    fn start_up(&self, key: &ServiceKey) -> Result<(), LifecycleError>;
}

/// Context passed to service factories and lifecycle hooks.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    key: &'a ServiceKey,
    lookup: &'a dyn ServiceLookup,
}

impl<'a> ServiceContext<'a> {
    pub fn new(key: &'a ServiceKey, lookup: &'a dyn ServiceLookup) -> Self {
        Self { key, lookup }
    }

    /// Key of the service being constructed, started or stopped.
    pub fn key(&self) -> &ServiceKey {
        self.key
    }

    /// The kernel the service is managed by.
    pub fn lookup(&self) -> &dyn ServiceLookup {
        self.lookup
    }

    pub fn is_active(&self, key: &ServiceKey) -> bool {
        self.lookup.is_active(key)
    }

    pub fn instance(&self, key: &ServiceKey) -> Result<Arc<dyn Service>, LifecycleError> {
        self.lookup.instance(key)
    }

    /// Typed lookup of an active service.
    pub fn instance_as<T: Service>(&self, key: &ServiceKey) -> Result<Arc<T>, LifecycleError> {
        downcast_instance(key, self.lookup.instance(key)?)
    }

    pub fn start_up(&self, key: &ServiceKey) -> Result<(), LifecycleError> {
        self.lookup.start_up(key)
    }
}
