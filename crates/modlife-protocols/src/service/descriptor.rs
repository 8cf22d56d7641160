//! Service descriptor types.

use std::fmt;
use std::sync::Arc;

use super::{Service, ServiceContext, ServiceFactory};
use crate::error::ServiceError;
use crate::ServiceKey;

/// Dependency that only applies while a configuration flag is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalDependency {
    pub flag: String,
    pub service: ServiceKey,
}

/// Static description of a singleton service.
///
/// The descriptor never holds the running instance; activation state is
/// owned by the kernel the descriptor is registered with.
#[derive(Clone)]
pub struct ServiceDescriptor {
    key: ServiceKey,
    name: String,
    dependencies: Vec<ServiceKey>,
    conditional: Vec<ConditionalDependency>,
    extends: Option<ServiceKey>,
    factory: Arc<dyn ServiceFactory>,
}

impl ServiceDescriptor {
    /// Create a new service descriptor.
    pub fn new(key: impl Into<ServiceKey>, factory: Arc<dyn ServiceFactory>) -> Self {
        let key = key.into();
        Self {
            name: key.to_string(),
            key,
            dependencies: Vec::new(),
            conditional: Vec::new(),
            extends: None,
            factory,
        }
    }

    /// Create a descriptor whose instances are built by the given function.
    pub fn from_fn<F>(key: impl Into<ServiceKey>, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_>) -> Result<Arc<dyn Service>, ServiceError> + Send + Sync + 'static,
    {
        Self::new(key, Arc::new(factory))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declare a hard dependency.
    pub fn depends_on(mut self, key: impl Into<ServiceKey>) -> Self {
        let key = key.into();
        if !self.dependencies.contains(&key) {
            self.dependencies.push(key);
        }
        self
    }

    /// Declare a dependency that applies while `flag` is enabled.
    pub fn depends_on_if(mut self, flag: impl Into<String>, key: impl Into<ServiceKey>) -> Self {
        self.conditional.push(ConditionalDependency {
            flag: flag.into(),
            service: key.into(),
        });
        self
    }

    /// Declare this service an extension of `host`.
    pub fn extends(mut self, host: impl Into<ServiceKey>) -> Self {
        self.extends = Some(host.into());
        self
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// Implementation name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unconditional dependencies in declaration order.
    pub fn dependencies(&self) -> &[ServiceKey] {
        &self.dependencies
    }

    pub fn conditional_dependencies(&self) -> &[ConditionalDependency] {
        &self.conditional
    }

    /// The declared host service, if this service is an extension.
    pub fn extended_service(&self) -> Option<&ServiceKey> {
        self.extends.as_ref()
    }

    pub fn factory(&self) -> &Arc<dyn ServiceFactory> {
        &self.factory
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("conditional", &self.conditional)
            .field("extends", &self.extends)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
