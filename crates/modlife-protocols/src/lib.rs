//! # modlife Protocols
//!
//! Boundary definitions for the modlife service kernel.
//! Contains only interface definitions and plain data - no lifecycle logic.
//!
//! ## Core Types
//!
//! - [`ServiceKey`] - Stable identity of a singleton service
//! - [`ServiceDescriptor`] - Static description of a service (dependencies, extension relation, factory)
//! - [`Service`] - Trait for running service instances
//! - [`ServiceFactory`] - Trait constructing service instances
//! - [`DeclarationSource`] - Read-only view on declared dependencies
//! - [`ServiceLookup`] - Reentrant access to the kernel from inside service hooks
//! - [`AmbientScope`] - Pluggable scope wrapped around start/stop sequences

pub mod error;
pub mod service;
pub mod types;

pub use error::{DependencyCycle, LifecycleError, RestartError, ServiceError};
pub use service::{
    AmbientScope, ConditionalDependency, DeclarationSource, ServiceContext, ServiceDescriptor,
    Service, ServiceFactory, ServiceLookup, ServiceState,
};
pub use types::ServiceKey;
