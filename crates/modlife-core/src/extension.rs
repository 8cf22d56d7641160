//! Reverse mapping from host services to their extensions.

use std::collections::HashMap;

use tracing::debug;

use modlife_protocols::error::LifecycleError;
use modlife_protocols::{DeclarationSource, ServiceKey};

use crate::registry::ServiceRegistry;

/// Extensions per host service, in registration order of the extensions.
///
/// The index is derived from the declarations at the time it is built; it
/// is rebuilt for every resolution because the extension relation may be
/// configuration-driven.
#[derive(Debug, Default, Clone)]
pub struct ExtensionIndex {
    extensions: HashMap<ServiceKey, Vec<ServiceKey>>,
}

impl ExtensionIndex {
    /// Build the index over every registered service.
    ///
    /// Fails if a declaration cannot be read or names a host that is not
    /// registered.
    pub fn build(
        registry: &ServiceRegistry,
        declarations: &dyn DeclarationSource,
    ) -> Result<Self, LifecycleError> {
        let mut index = Self::default();
        for descriptor in registry.descriptors() {
            let Some(host) = declarations.extended_service(&descriptor)? else {
                continue;
            };
            if !registry.contains(&host) {
                return Err(LifecycleError::Configuration {
                    service: descriptor.key().clone(),
                    reason: format!("extended service '{host}' is not registered"),
                });
            }
            index.insert(host, descriptor.key().clone());
        }
        debug!(hosts = index.extensions.len(), "Built extension index");
        Ok(index)
    }

    fn insert(&mut self, host: ServiceKey, extension: ServiceKey) {
        let entry = self.extensions.entry(host).or_default();
        if !entry.contains(&extension) {
            entry.push(extension);
        }
    }

    /// Extensions of the given host; empty if it has none.
    pub fn extensions_of(&self, host: &ServiceKey) -> &[ServiceKey] {
        self.extensions.get(host).map(Vec::as_slice).unwrap_or(&[])
    }
}
