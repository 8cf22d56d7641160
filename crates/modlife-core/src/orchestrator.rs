//! The lifecycle orchestrator.
//!
//! Owns the running instances and the reverse-dependency bookkeeping, and
//! drives startup and cascading shutdown using the [`DependencyResolver`].
//!
//! All mutating entry points run under one orchestrator-wide reentrant lock,
//! so service hooks may call back into the orchestrator from the thread that
//! is starting or stopping them.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::iter::Peekable;
use std::sync::Arc;
use std::vec;

use parking_lot::ReentrantMutex;
use tracing::{debug, error, info, warn};

use modlife_config::ConfigHandle;
use modlife_protocols::error::LifecycleError;
use modlife_protocols::service::downcast_instance;
use modlife_protocols::{
    AmbientScope, DeclarationSource, Service, ServiceContext, ServiceKey, ServiceLookup, ServiceState,
};

use crate::context::ContextId;
use crate::declarations::ConfiguredDeclarations;
use crate::registry::ServiceRegistry;
use crate::resolver::{DependencyResolver, ResolvedService};

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

type Sequence = Peekable<vec::IntoIter<ResolvedService>>;

/// A running instance and its lifecycle state.
struct Slot {
    instance: Arc<dyn Service>,
    state: ServiceState,
}

/// Entry of the startup context stack.
pub(crate) enum Frame {
    /// Records the services started while it is innermost.
    Scoped {
        id: ContextId,
        started: Vec<ServiceKey>,
    },
    /// Swallows start notifications, used while restarting.
    Detached,
}

#[derive(Default)]
pub(crate) struct OrchestratorState {
    slots: HashMap<ServiceKey, Slot>,
    /// Fully started services in start order.
    active: Vec<ServiceKey>,
    /// Reverse edges. `None` collects services without dependencies and
    /// without extended service.
    dependents: HashMap<Option<ServiceKey>, Vec<ServiceKey>>,
    pub(crate) contexts: Vec<Frame>,
}

impl OrchestratorState {
    pub(crate) fn has_instance(&self, key: &ServiceKey) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn direct_dependents(&self, key: Option<&ServiceKey>) -> &[ServiceKey] {
        self.dependents
            .get(&key.cloned())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn add_dependent(&mut self, dependency: Option<ServiceKey>, dependent: &ServiceKey) {
        let entry = self.dependents.entry(dependency).or_default();
        if !entry.contains(dependent) {
            entry.push(dependent.clone());
        }
    }

    /// `key` and everything recorded as depending on it, dependents first.
    ///
    /// Follows stale edges of services that are no longer running; those
    /// are skipped when stopping.
    fn shutdown_order(&self, key: &ServiceKey) -> Vec<ServiceKey> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.collect_shutdown_order(key, &mut order, &mut seen);
        order
    }

    fn collect_shutdown_order(&self, key: &ServiceKey, order: &mut Vec<ServiceKey>, seen: &mut HashSet<ServiceKey>) {
        if !seen.insert(key.clone()) {
            return;
        }
        for dependent in self.direct_dependents(Some(key)) {
            self.collect_shutdown_order(dependent, order, seen);
        }
        order.push(key.clone());
    }

    /// Drop the bookkeeping rooted at `key`; it is re-derived on next start.
    fn purge_dependents(&mut self, key: &ServiceKey) {
        if let Some(dependents) = self.dependents.remove(&Some(key.clone())) {
            for dependent in &dependents {
                self.purge_dependents(dependent);
            }
        }
    }

    fn collect_active_dependents(&self, key: Option<&ServiceKey>, result: &mut Vec<ServiceKey>) {
        for dependent in self.direct_dependents(key) {
            if !self.has_instance(dependent) || result.contains(dependent) {
                continue;
            }
            result.push(dependent.clone());
            self.collect_active_dependents(Some(dependent), result);
        }
    }
}

struct Ambient {
    bootstrap: ServiceKey,
    scope: Arc<dyn AmbientScope>,
}

/// Lifecycle orchestrator for the services of one registry.
///
/// ```ignore
/// let orchestrator = Orchestrator::new(registry, config);
/// orchestrator.start_up(&ServiceKey::new("web"))?;
/// let web = orchestrator.instance_as::<WebServer>(&ServiceKey::new("web"))?;
/// ```
pub struct Orchestrator {
    registry: Arc<ServiceRegistry>,
    config: ConfigHandle,
    declarations: Arc<dyn DeclarationSource>,
    ambient: Option<Ambient>,
    pub(crate) state: ReentrantMutex<RefCell<OrchestratorState>>,
}

impl Orchestrator {
    /// Create an orchestrator reading declarations from the descriptors and `config`.
    pub fn new(registry: Arc<ServiceRegistry>, config: ConfigHandle) -> Self {
        let declarations = Arc::new(ConfiguredDeclarations::new(config.clone()));
        Self {
            registry,
            config,
            declarations,
            ambient: None,
            state: ReentrantMutex::new(RefCell::new(OrchestratorState::default())),
        }
    }

    /// Replace the source of dependency declarations.
    pub fn with_declarations(mut self, declarations: Arc<dyn DeclarationSource>) -> Self {
        self.declarations = declarations;
        self
    }

    /// Run start and stop sequences inside `scope` once `bootstrap` is active.
    pub fn with_ambient_scope(mut self, bootstrap: impl Into<ServiceKey>, scope: Arc<dyn AmbientScope>) -> Self {
        self.ambient = Some(Ambient {
            bootstrap: bootstrap.into(),
            scope,
        });
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut OrchestratorState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    pub(crate) fn read_state<R>(&self, f: impl FnOnce(&OrchestratorState) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    // ---- Start ----

    /// Start a service with all its dependencies.
    ///
    /// No-op if the service is already active. On failure the failing
    /// service is inactive again; services started before it in the same
    /// call stay active.
    pub fn start_up(&self, key: &ServiceKey) -> Result<(), LifecycleError> {
        let _lock = self.state.lock();
        if self.is_active(key) {
            return Ok(());
        }
        let mut started = Vec::new();
        self.start_tracked(key, &mut started)
    }

    /// Start all services listed in `autostart`, in order.
    pub fn start_configured(&self) -> Result<(), LifecycleError> {
        let autostart = self.config.read(|config| config.autostart.clone());
        info!("Starting {} configured services", autostart.len());
        for raw in autostart {
            self.start_up(&ServiceKey::new(raw.trim()))?;
        }
        Ok(())
    }

    /// Resolve and start `key`, appending every newly started service to `started`.
    pub(crate) fn start_tracked(&self, key: &ServiceKey, started: &mut Vec<ServiceKey>) -> Result<(), LifecycleError> {
        let plan = self.plan(key)?;
        let mut sequence = plan.into_iter().peekable();
        match &self.ambient {
            Some(ambient) if self.is_active(&ambient.bootstrap) => {
                self.start_in_scope(ambient, &mut sequence, started)
            }
            Some(ambient) => {
                while let Some(next) = sequence.next() {
                    let bootstrap = next.key() == &ambient.bootstrap;
                    self.start_service(next, started)?;
                    if bootstrap && sequence.peek().is_some() {
                        return self.start_in_scope(ambient, &mut sequence, started);
                    }
                }
                Ok(())
            }
            None => {
                for next in sequence {
                    self.start_service(next, started)?;
                }
                Ok(())
            }
        }
    }

    fn plan(&self, key: &ServiceKey) -> Result<Vec<ResolvedService>, LifecycleError> {
        let active: HashSet<ServiceKey> = self.read_state(|state| state.slots.keys().cloned().collect());
        DependencyResolver::new(&self.registry, self.declarations.as_ref(), &active).resolve(key)
    }

    fn start_in_scope(
        &self,
        ambient: &Ambient,
        sequence: &mut Sequence,
        started: &mut Vec<ServiceKey>,
    ) -> Result<(), LifecycleError> {
        let mut body = || -> Result<(), LifecycleError> {
            for next in &mut *sequence {
                self.start_service(next, started)?;
            }
            Ok(())
        };
        ambient.scope.run(&mut body)
    }

    /// Construct, start and record a single service whose dependencies are running.
    fn start_service(&self, resolved: ResolvedService, started: &mut Vec<ServiceKey>) -> Result<(), LifecycleError> {
        let key = resolved.key().clone();
        if self.is_active(&key) {
            return Ok(());
        }

        let ctx = ServiceContext::new(&key, self);
        debug!(service = %key, name = resolved.descriptor.name(), "Constructing service");
        let instance = resolved.descriptor.factory().create(&ctx).map_err(|source| {
            error!(service = %key, "Failed to construct service {}: {}", key, source);
            LifecycleError::StartupFailed {
                service: key.clone(),
                source,
            }
        })?;

        let inserted = self.with_state(|state| {
            if state.slots.contains_key(&key) {
                return false;
            }
            state.slots.insert(
                key.clone(),
                Slot {
                    instance: instance.clone(),
                    state: ServiceState::Starting,
                },
            );
            true
        });
        if !inserted {
            // Started by its own factory.
            return Ok(());
        }

        if let Err(source) = instance.start_up(&ctx) {
            self.with_state(|state| {
                state.slots.remove(&key);
            });
            error!(service = %key, "Startup of service {} failed: {}", key, source);
            return Err(LifecycleError::StartupFailed { service: key, source });
        }

        if self.mark_started(&resolved) {
            started.push(key.clone());
            info!(service = %key, "Service started: {}", key);
        }
        Ok(())
    }

    /// Record a completed startup. False if the service was stopped from inside its own hook.
    fn mark_started(&self, resolved: &ResolvedService) -> bool {
        let key = resolved.key();
        self.with_state(|state| {
            match state.slots.get_mut(key) {
                Some(slot) if slot.state == ServiceState::Starting => slot.state = ServiceState::Active,
                _ => return false,
            }
            state.active.push(key.clone());
            if let Some(Frame::Scoped { started, .. }) = state.contexts.last_mut() {
                started.push(key.clone());
            }

            if resolved.dependencies.is_empty() && resolved.extends.is_none() {
                state.add_dependent(None, key);
            } else {
                for dependency in &resolved.dependencies {
                    state.add_dependent(Some(dependency.clone()), key);
                }
                if let Some(host) = &resolved.extends {
                    state.add_dependent(Some(host.clone()), key);
                }
            }
            true
        })
    }

    // ---- Stop ----

    /// Stop a service after everything that depends on it.
    ///
    /// No-op if the service is not running. Failing shutdown hooks are
    /// logged; the service is inactive afterwards regardless.
    pub fn shut_down(&self, key: &ServiceKey) {
        let _lock = self.state.lock();
        if !matches!(self.state(key), ServiceState::Starting | ServiceState::Active) {
            return;
        }
        let order = self.read_state(|state| state.shutdown_order(key));
        debug!(service = %key, "Shutting down {} services", order.len());
        self.stop_sequence(order);
    }

    /// Stop every running service.
    pub fn shut_down_all(&self) {
        let _lock = self.state.lock();
        let roots = self.read_state(|state| state.direct_dependents(None).to_vec());
        info!("Shutting down all services");
        for root in roots.iter().rev() {
            self.shut_down(root);
        }
        let remaining = self.active_services();
        for key in remaining.iter().rev() {
            self.shut_down(key);
        }
    }

    fn stop_sequence(&self, order: Vec<ServiceKey>) {
        let mut remaining = order.into_iter();
        if let Some(ambient) = self.ambient.as_ref().filter(|a| self.is_active(&a.bootstrap)) {
            let mut bootstrap = None;
            let mut body = || -> Result<(), LifecycleError> {
                for key in &mut remaining {
                    if key == ambient.bootstrap {
                        // Cannot be stopped inside its own scope.
                        bootstrap = Some(key);
                        break;
                    }
                    self.stop_service(&key);
                }
                Ok(())
            };
            if let Err(err) = ambient.scope.run(&mut body) {
                warn!("Ambient scope failed during shutdown: {}", err);
            }
            if let Some(key) = bootstrap {
                self.stop_service(&key);
            }
        }
        for key in remaining {
            self.stop_service(&key);
        }
    }

    fn stop_service(&self, key: &ServiceKey) {
        let instance = self.with_state(|state| match state.slots.get_mut(key) {
            Some(slot) if slot.state != ServiceState::Stopping => {
                slot.state = ServiceState::Stopping;
                Some(slot.instance.clone())
            }
            _ => None,
        });
        let Some(instance) = instance else {
            return;
        };

        let ctx = ServiceContext::new(key, self);
        if let Err(err) = instance.shut_down(&ctx) {
            warn!(service = %key, "Shutdown of service {} failed: {}", key, err);
        }

        let configuration_root = self.is_configuration_root(key);
        self.with_state(|state| {
            state.slots.remove(key);
            state.active.retain(|active| active != key);
            if configuration_root {
                state.purge_dependents(key);
            }
        });
        info!(service = %key, "Service stopped: {}", key);
    }

    pub(crate) fn is_configuration_root(&self, key: &ServiceKey) -> bool {
        self.config
            .read(|config| config.configuration_root.as_deref() == Some(key.as_str()))
    }

    // ---- Scoped use ----

    /// Start `keys`, run `computation`, then stop exactly what this call started.
    ///
    /// Services are stopped in reverse start order, also when the
    /// computation fails. If a service cannot be started, the ones started
    /// so far are stopped and the error is returned.
    pub fn run_with_services<R, E>(
        &self,
        keys: &[ServiceKey],
        computation: impl FnOnce(&Self) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<LifecycleError>,
    {
        let mut started = StartedServices {
            orchestrator: self,
            keys: Vec::new(),
        };
        {
            let _lock = self.state.lock();
            for key in keys {
                if self.is_active(key) {
                    continue;
                }
                if let Err(err) = self.start_tracked(key, &mut started.keys) {
                    error!(service = %key, "Unable to start service {} for computation: {}", key, err);
                    return Err(err.into());
                }
            }
        }
        computation(self)
    }

    // ---- Queries ----

    /// Whether an instance of the service exists.
    pub fn is_active(&self, key: &ServiceKey) -> bool {
        self.read_state(|state| state.has_instance(key))
    }

    pub fn state(&self, key: &ServiceKey) -> ServiceState {
        self.read_state(|state| {
            state
                .slots
                .get(key)
                .map(|slot| slot.state)
                .unwrap_or(ServiceState::Inactive)
        })
    }

    /// The instance of a running service.
    pub fn instance(&self, key: &ServiceKey) -> Result<Arc<dyn Service>, LifecycleError> {
        self.read_state(|state| state.slots.get(key).map(|slot| slot.instance.clone()))
            .ok_or_else(|| LifecycleError::NotActive(key.clone()))
    }

    /// The instance of a running service, downcast to its implementation type.
    pub fn instance_as<T: Service>(&self, key: &ServiceKey) -> Result<Arc<T>, LifecycleError> {
        downcast_instance(key, self.instance(key)?)
    }

    /// Fully started services in start order.
    pub fn active_services(&self) -> Vec<ServiceKey> {
        self.read_state(|state| state.active.clone())
    }

    /// The start sequence `start_up(key)` would run now.
    pub fn resolve(&self, key: &ServiceKey) -> Result<Vec<ServiceKey>, LifecycleError> {
        let _lock = self.state.lock();
        Ok(self
            .plan(key)?
            .iter()
            .map(|resolved| resolved.key().clone())
            .collect())
    }

    /// Running services that directly depend on `key`.
    ///
    /// `None` yields the running services without dependencies and without
    /// extended service.
    pub fn direct_dependents(&self, key: Option<&ServiceKey>) -> Vec<ServiceKey> {
        self.read_state(|state| {
            state
                .direct_dependents(key)
                .iter()
                .filter(|dependent| state.has_instance(dependent))
                .cloned()
                .collect()
        })
    }

    /// Running services that transitively depend on `key`.
    pub fn all_dependents(&self, key: Option<&ServiceKey>, with_root: bool) -> Vec<ServiceKey> {
        self.read_state(|state| {
            let mut result = Vec::new();
            if let Some(root) = key.filter(|_| with_root) {
                result.push(root.clone());
            }
            state.collect_active_dependents(key, &mut result);
            result
        })
    }

    /// Subset of `keys` in which no member depends on another, such that
    /// every given service is one of them or depends on one of them.
    pub fn independent(&self, keys: &[ServiceKey]) -> Vec<ServiceKey> {
        self.read_state(|state| {
            let mut candidates: HashSet<ServiceKey> = keys.iter().cloned().collect();
            let mut independents: Vec<ServiceKey> = Vec::new();
            for key in keys {
                if !candidates.contains(key) {
                    continue;
                }
                let mut covered = vec![key.clone()];
                state.collect_active_dependents(Some(key), &mut covered);
                for removed in &covered {
                    candidates.remove(removed);
                }
                independents.retain(|independent| !covered.contains(independent));
                independents.push(key.clone());
            }
            independents
        })
    }
}

/// Services started on behalf of a computation; stopped in reverse on drop.
struct StartedServices<'a> {
    orchestrator: &'a Orchestrator,
    keys: Vec<ServiceKey>,
}

impl Drop for StartedServices<'_> {
    fn drop(&mut self) {
        for key in self.keys.iter().rev() {
            self.orchestrator.shut_down(key);
        }
    }
}

impl ServiceLookup for Orchestrator {
    fn is_active(&self, key: &ServiceKey) -> bool {
        Orchestrator::is_active(self, key)
    }

    fn instance(&self, key: &ServiceKey) -> Result<Arc<dyn Service>, LifecycleError> {
        Orchestrator::instance(self, key)
    }

    fn start_up(&self, key: &ServiceKey) -> Result<(), LifecycleError> {
        Orchestrator::start_up(self, key)
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.read_state(|state| state.slots.is_empty()) {
            return;
        }
        warn!("Orchestrator dropped with running services");
        self.shut_down_all();
    }
}
