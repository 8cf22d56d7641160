//! Registry of service descriptors.
//!
//! Maps each [`ServiceKey`] to its one descriptor. Registration happens
//! before services are started; lookups are lock-free with respect to the
//! orchestrator.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use modlife_protocols::error::LifecycleError;
use modlife_protocols::{ServiceDescriptor, ServiceKey};

struct Registered {
    sequence: u64,
    descriptor: Arc<ServiceDescriptor>,
}

/// Registry for managing service descriptors.
pub struct ServiceRegistry {
    descriptors: DashMap<ServiceKey, Registered>,
    next_sequence: AtomicU64,
}

impl ServiceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            descriptors: DashMap::new(),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Register a descriptor.
    ///
    /// Returns an error if a descriptor with the same key is already registered.
    pub fn register(&self, descriptor: ServiceDescriptor) -> Result<Arc<ServiceDescriptor>, LifecycleError> {
        let key = descriptor.key().clone();
        match self.descriptors.entry(key) {
            Entry::Occupied(entry) => Err(LifecycleError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                let descriptor = Arc::new(descriptor);
                entry.insert(Registered {
                    sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
                    descriptor: descriptor.clone(),
                });
                Ok(descriptor)
            }
        }
    }

    /// Get a descriptor by key.
    pub fn get(&self, key: &ServiceKey) -> Option<Arc<ServiceDescriptor>> {
        self.descriptors.get(key).map(|entry| entry.descriptor.clone())
    }

    /// Get a descriptor by key, failing for unknown keys.
    pub fn require(&self, key: &ServiceKey) -> Result<Arc<ServiceDescriptor>, LifecycleError> {
        self.get(key)
            .ok_or_else(|| LifecycleError::UnknownService(key.clone()))
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.descriptors.contains_key(key)
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> Vec<Arc<ServiceDescriptor>> {
        let mut entries: Vec<_> = self
            .descriptors
            .iter()
            .map(|entry| (entry.sequence, entry.descriptor.clone()))
            .collect();
        entries.sort_by_key(|(sequence, _)| *sequence);
        entries.into_iter().map(|(_, descriptor)| descriptor).collect()
    }

    /// All keys in registration order.
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.descriptors()
            .iter()
            .map(|descriptor| descriptor.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
