//! Shared fixtures for unit tests.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use modlife_config::{ConfigHandle, KernelConfig};
use modlife_protocols::error::{LifecycleError, ServiceError};
use modlife_protocols::{AmbientScope, Service, ServiceContext, ServiceDescriptor, ServiceKey};

use crate::{Orchestrator, ServiceRegistry};

pub(crate) fn key(name: &str) -> ServiceKey {
    ServiceKey::new(name)
}

pub(crate) fn keys(names: &[&str]) -> Vec<ServiceKey> {
    names.iter().map(|name| key(name)).collect()
}

#[derive(Debug)]
pub(crate) struct Noop;

impl Service for Noop {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) fn noop(name: &str) -> ServiceDescriptor {
    ServiceDescriptor::from_fn(name, |_ctx| Ok(Arc::new(Noop) as Arc<dyn Service>))
}

/// Ordered log of hook invocations across services.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().clear();
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| e.as_str() == entry).count()
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct Faults {
    pub(crate) construct: bool,
    pub(crate) start: bool,
    pub(crate) stop: bool,
}

pub(crate) struct Probe {
    key: ServiceKey,
    journal: Journal,
    faults: Faults,
}

impl Service for Probe {
    fn start_up(&self, _ctx: &ServiceContext<'_>) -> Result<(), ServiceError> {
        self.journal.record(format!("start:{}", self.key));
        if self.faults.start {
            return Err(ServiceError::InitializationFailed(format!("{} refused", self.key)));
        }
        Ok(())
    }

    fn shut_down(&self, _ctx: &ServiceContext<'_>) -> Result<(), ServiceError> {
        self.journal.record(format!("stop:{}", self.key));
        if self.faults.stop {
            return Err(ServiceError::ShutdownFailed(format!("{} stuck", self.key)));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) fn probe(name: &str, journal: &Journal) -> ServiceDescriptor {
    faulty_probe(name, journal, Faults::default())
}

pub(crate) fn faulty_probe(name: &str, journal: &Journal, faults: Faults) -> ServiceDescriptor {
    let journal = journal.clone();
    ServiceDescriptor::from_fn(name, move |ctx| {
        if faults.construct {
            return Err(ServiceError::InitializationFailed(format!(
                "cannot construct {}",
                ctx.key()
            )));
        }
        Ok(Arc::new(Probe {
            key: ctx.key().clone(),
            journal: journal.clone(),
            faults,
        }) as Arc<dyn Service>)
    })
}

pub(crate) fn orchestrator(descriptors: Vec<ServiceDescriptor>) -> Orchestrator {
    orchestrator_with(KernelConfig::default(), descriptors)
}

pub(crate) fn orchestrator_with(config: KernelConfig, descriptors: Vec<ServiceDescriptor>) -> Orchestrator {
    let registry = ServiceRegistry::new();
    for descriptor in descriptors {
        registry
            .register(descriptor)
            .expect("test descriptors use unique keys");
    }
    Orchestrator::new(Arc::new(registry), ConfigHandle::new(config))
}

/// Ambient scope journaling "enter" and "exit" around the body.
pub(crate) struct RecordingScope(pub(crate) Journal);

impl AmbientScope for RecordingScope {
    fn run(&self, body: &mut dyn FnMut() -> Result<(), LifecycleError>) -> Result<(), LifecycleError> {
        self.0.record("enter");
        let result = body();
        self.0.record("exit");
        result
    }
}
