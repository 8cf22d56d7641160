//! Service trait definitions.

use std::any::{type_name, Any};
use std::sync::Arc;

use super::ServiceContext;
use crate::error::{LifecycleError, ServiceError};
use crate::ServiceKey;

/// Core trait for all managed services.
///
/// An instance is owned by the kernel between startup and shutdown. Both
/// hooks may call back into the kernel through the given context.
pub trait Service: Send + Sync + 'static {
    /// Called after construction, before the service counts as started.
    fn start_up(&self, _ctx: &ServiceContext<'_>) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Called once before the instance is dropped by the kernel.
    fn shut_down(&self, _ctx: &ServiceContext<'_>) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Returns a reference to the service as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts the shared instance into `Any` for typed lookups.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Constructs the implementation object of a service.
pub trait ServiceFactory: Send + Sync {
    fn create(&self, ctx: &ServiceContext<'_>) -> Result<Arc<dyn Service>, ServiceError>;
}

impl<F> ServiceFactory for F
where
    F: Fn(&ServiceContext<'_>) -> Result<Arc<dyn Service>, ServiceError> + Send + Sync,
{
    fn create(&self, ctx: &ServiceContext<'_>) -> Result<Arc<dyn Service>, ServiceError> {
        self(ctx)
    }
}

/// Downcast a service instance to its implementation type.
pub fn downcast_instance<T: Service>(
    key: &ServiceKey,
    instance: Arc<dyn Service>,
) -> Result<Arc<T>, LifecycleError> {
    instance
        .into_any()
        .downcast::<T>()
        .map_err(|_| LifecycleError::TypeMismatch {
            service: key.clone(),
            expected: type_name::<T>(),
        })
}
