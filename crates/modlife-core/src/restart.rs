//! Restart of a service together with everything running on top of it.

use tracing::{error, info};

use modlife_protocols::error::{LifecycleError, RestartError, ServiceError};
use modlife_protocols::ServiceKey;

use crate::orchestrator::{Orchestrator, OrchestratorState};

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;

impl OrchestratorState {
    /// Collect the topmost running dependents of `key` into `roots`.
    ///
    /// A running service is recorded unless one of its recorded dependents
    /// is running and got recorded (or was recorded already); starting the
    /// recorded services brings back every running service above `key`.
    /// Returns whether `roots` changed.
    fn collect_restart_roots(&self, key: &ServiceKey, roots: &mut Vec<ServiceKey>) -> bool {
        if !self.has_instance(key) {
            return false;
        }
        let mut dependent_recorded = false;
        for dependent in self.direct_dependents(Some(key)) {
            dependent_recorded |= self.collect_restart_roots(dependent, roots);
        }
        if dependent_recorded {
            return true;
        }
        if roots.contains(key) {
            return false;
        }
        roots.push(key.clone());
        true
    }
}

impl Orchestrator {
    /// Restart a running service and everything running on top of it.
    pub fn restart(&self, key: &ServiceKey) -> Result<(), LifecycleError> {
        self.restart_with(key, || Ok(()))
    }

    /// Stop `key` with its dependents, run `callback`, and start them again.
    ///
    /// Services started during the restart are not recorded in any open
    /// startup context. If the callback or a restart fails, the error
    /// carries the services that were to be restarted and the services
    /// running before, for manual recovery.
    pub fn restart_with<F>(&self, key: &ServiceKey, callback: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Result<(), ServiceError>,
    {
        let _lock = self.state.lock();
        if !self.is_active(key) {
            return Err(LifecycleError::NotActive(key.clone()));
        }
        let _detached = self.detach_context();

        let active_before = self.active_services();
        let to_restart = self.read_state(|state| {
            let mut roots = Vec::new();
            state.collect_restart_roots(key, &mut roots);
            roots
        });
        info!(
            service = %key,
            to_restart = ?to_restart.iter().map(ServiceKey::as_str).collect::<Vec<_>>(),
            "Restarting service {}", key
        );

        self.shut_down(key);
        let result = callback()
            .map_err(LifecycleError::CallbackFailed)
            .and_then(|()| {
                if self.is_configuration_root(key) {
                    // Dependents derive their declarations from it.
                    self.start_up(key)?;
                }
                for service in &to_restart {
                    self.start_up(service)?;
                }
                Ok(())
            });

        result.map_err(|source| {
            error!(service = %key, "Unable to restart {}: {}", key, source);
            RestartError {
                service: key.clone(),
                to_restart,
                active_before,
                source,
            }
            .into()
        })
    }
}
