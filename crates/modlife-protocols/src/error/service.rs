//! Errors raised by service implementations.

use thiserror::Error;

use super::LifecycleError;

/// Error returned by service factories and lifecycle hooks.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Service shutdown failed: {0}")]
    ShutdownFailed(String),

    /// A kernel call made from inside a hook failed.
    #[error(transparent)]
    Lifecycle(Box<LifecycleError>),

    #[error("{0}")]
    Custom(String),
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        ServiceError::Lifecycle(Box::new(err))
    }
}
