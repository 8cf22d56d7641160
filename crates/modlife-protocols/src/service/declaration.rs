//! Read-only access to service declarations.

use super::ServiceDescriptor;
use crate::error::LifecycleError;
use crate::ServiceKey;

/// Source of the effective declarations of a service.
///
/// Declarations may depend on external configuration, so reading them can
/// fail; failures are reported as [`LifecycleError::Configuration`].
pub trait DeclarationSource: Send + Sync {
    /// All direct dependencies of the service, in declaration order.
    fn dependencies(&self, descriptor: &ServiceDescriptor) -> Result<Vec<ServiceKey>, LifecycleError>;

    /// The service the given one extends, if any.
    fn extended_service(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<Option<ServiceKey>, LifecycleError>;
}
