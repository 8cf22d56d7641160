//! Dependency resolution.
//!
//! Computes the start sequence for a service: every transitive dependency
//! that is not yet active, followed by the service itself. Extensions of a
//! service are placed directly after it, before anything that merely shares
//! a dependency with it.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use modlife_protocols::error::{DependencyCycle, LifecycleError};
use modlife_protocols::{DeclarationSource, ServiceDescriptor, ServiceKey};

use crate::extension::ExtensionIndex;
use crate::registry::ServiceRegistry;

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// One entry of a start sequence, with the declarations read while resolving.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub descriptor: Arc<ServiceDescriptor>,
    /// Effective dependencies at resolution time.
    pub dependencies: Vec<ServiceKey>,
    /// Effective extended service at resolution time.
    pub extends: Option<ServiceKey>,
}

impl ResolvedService {
    pub fn key(&self) -> &ServiceKey {
        self.descriptor.key()
    }
}

/// Resolves start sequences against a registry and a declaration source.
///
/// Resolution never mutates anything; failures leave the caller's state
/// untouched.
pub struct DependencyResolver<'a> {
    registry: &'a ServiceRegistry,
    declarations: &'a dyn DeclarationSource,
    active: &'a HashSet<ServiceKey>,
}

/// Working set of a single resolution.
#[derive(Default)]
struct Resolution {
    /// Services being visited, outermost first.
    pending: Vec<ServiceKey>,
    placed: HashSet<ServiceKey>,
    order: Vec<ResolvedService>,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver. Services in `active` are treated as satisfied.
    pub fn new(
        registry: &'a ServiceRegistry,
        declarations: &'a dyn DeclarationSource,
        active: &'a HashSet<ServiceKey>,
    ) -> Self {
        Self {
            registry,
            declarations,
            active,
        }
    }

    /// Resolve the start sequence of `target`.
    ///
    /// Empty if `target` is already active.
    pub fn resolve(&self, target: &ServiceKey) -> Result<Vec<ResolvedService>, LifecycleError> {
        self.registry.require(target)?;

        let index = ExtensionIndex::build(self.registry, self.declarations)?;
        let mut run = Resolution::default();
        self.visit(&index, &mut run, target, None)?;

        debug!(
            service = %target,
            sequence = ?run.order.iter().map(|r| r.key().as_str()).collect::<Vec<_>>(),
            "Resolved start sequence"
        );
        Ok(run.order)
    }

    fn visit(
        &self,
        index: &ExtensionIndex,
        run: &mut Resolution,
        key: &ServiceKey,
        referrer: Option<&ServiceKey>,
    ) -> Result<(), LifecycleError> {
        if run.placed.contains(key) || self.active.contains(key) {
            return Ok(());
        }
        if let Some(position) = run.pending.iter().position(|pending| pending == key) {
            return Err(LifecycleError::CyclicDependency(cycle(&run.pending[position..])));
        }

        let descriptor = self.descriptor(key, referrer)?;
        let dependencies = self.declarations.dependencies(&descriptor)?;
        let extends = self.declarations.extended_service(&descriptor)?;

        run.pending.push(key.clone());
        for dependency in &dependencies {
            self.visit(index, run, dependency, Some(key))?;
        }
        // An extension requires its host, although it is no prerequisite
        // of the host's dependents.
        if let Some(host) = &extends {
            self.visit(index, run, host, Some(key))?;
        }
        run.pending.pop();

        run.placed.insert(key.clone());
        run.order.push(ResolvedService {
            descriptor,
            dependencies,
            extends,
        });

        for extension in index.extensions_of(key) {
            if run.pending.contains(extension) {
                // Placed by its own frame further up.
                continue;
            }
            self.visit(index, run, extension, Some(key))?;
        }
        Ok(())
    }

    fn descriptor(
        &self,
        key: &ServiceKey,
        referrer: Option<&ServiceKey>,
    ) -> Result<Arc<ServiceDescriptor>, LifecycleError> {
        match (self.registry.get(key), referrer) {
            (Some(descriptor), _) => Ok(descriptor),
            (None, Some(referrer)) => Err(LifecycleError::Configuration {
                service: referrer.clone(),
                reason: format!("referenced service '{key}' is not registered"),
            }),
            (None, None) => Err(LifecycleError::UnknownService(key.clone())),
        }
    }
}

/// Build the cycle chain from the pending path starting at the repeated service.
///
/// For the path `[a, b, c]` re-entering `a`, the chain is `a <- c <- b <- a`.
fn cycle(path: &[ServiceKey]) -> DependencyCycle {
    let mut chain = Vec::with_capacity(path.len() + 1);
    chain.push(path[0].clone());
    chain.extend(path[1..].iter().rev().cloned());
    chain.push(path[0].clone());
    DependencyCycle::new(chain)
}
