//! Lifecycle errors raised at the kernel boundary.

use std::fmt;

use thiserror::Error;

use super::ServiceError;
use crate::ServiceKey;

/// Errors raised by the service kernel.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Cyclic service dependency: {0}")]
    CyclicDependency(DependencyCycle),

    #[error("Unable to resolve declarations of service {service}: {reason}")]
    Configuration { service: ServiceKey, reason: String },

    #[error("Service not registered: {0}")]
    UnknownService(ServiceKey),

    #[error("Service already registered: {0}")]
    AlreadyRegistered(ServiceKey),

    #[error("Startup of service {service} failed: {source}")]
    StartupFailed {
        service: ServiceKey,
        #[source]
        source: ServiceError,
    },

    #[error("Service {0} not started")]
    NotActive(ServiceKey),

    #[error("Service {service} is not of type {expected}")]
    TypeMismatch {
        service: ServiceKey,
        expected: &'static str,
    },

    #[error("Context {context} is not the innermost open context")]
    NotInnermostContext { context: String },

    #[error("Restart callback failed: {0}")]
    CallbackFailed(#[source] ServiceError),

    #[error(transparent)]
    Restart(Box<RestartError>),
}

impl LifecycleError {
    /// The service the failure is attributed to, if any.
    pub fn service(&self) -> Option<&ServiceKey> {
        match self {
            LifecycleError::Configuration { service, .. }
            | LifecycleError::StartupFailed { service, .. }
            | LifecycleError::TypeMismatch { service, .. } => Some(service),
            LifecycleError::UnknownService(key)
            | LifecycleError::AlreadyRegistered(key)
            | LifecycleError::NotActive(key) => Some(key),
            LifecycleError::CyclicDependency(cycle) => cycle.chain.first(),
            LifecycleError::Restart(err) => Some(&err.service),
            LifecycleError::NotInnermostContext { .. } | LifecycleError::CallbackFailed(_) => None,
        }
    }
}

impl From<RestartError> for LifecycleError {
    fn from(err: RestartError) -> Self {
        LifecycleError::Restart(Box::new(err))
    }
}

/// A dependency cycle found during resolution.
///
/// The chain starts and ends with the same service; each element is depended
/// on by the element following it, so `[a, b, a]` reads "a is required by b,
/// which is required by a".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    pub chain: Vec<ServiceKey>,
}

impl DependencyCycle {
    pub fn new(chain: Vec<ServiceKey>) -> Self {
        Self { chain }
    }

    /// Whether the given service takes part in the cycle.
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.chain.contains(key)
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_str(" <- ")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

/// Failure while restarting a service subtree.
///
/// Carries what is needed for manual recovery: the services that would have
/// been started again and the services active when the restart began.
#[derive(Debug, Error)]
#[error("Unable to restart '{service}': {source}")]
pub struct RestartError {
    pub service: ServiceKey,
    /// Topmost active dependents recorded before shutdown.
    pub to_restart: Vec<ServiceKey>,
    /// Active services at the time the restart began, in start order.
    pub active_before: Vec<ServiceKey>,
    #[source]
    pub source: LifecycleError,
}
