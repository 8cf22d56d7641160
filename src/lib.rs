//! # modlife
//!
//! In-process lifecycle kernel for long-lived singleton services:
//! dependency-ordered startup with cycle detection, extension services
//! co-started with their host, cascading shutdown, scoped startup contexts
//! that roll back what they started, and subtree restart.
//!
//! ## Crates
//!
//! - [`protocols`] - Service traits, descriptors and the error taxonomy
//! - [`config`] - Kernel configuration (TOML), validation and live handle
//! - [`kernel`] - Registry, resolver and orchestrator
//!
//! ```ignore
//! use std::sync::Arc;
//! use modlife::{ConfigHandle, Orchestrator, ServiceDescriptor, ServiceRegistry};
//!
//! let registry = ServiceRegistry::new();
//! registry.register(ServiceDescriptor::from_fn("db", |_| Ok(Arc::new(Database::default()))))?;
//! registry.register(ServiceDescriptor::from_fn("web", |_| Ok(Arc::new(WebServer::default()))).depends_on("db"))?;
//!
//! let orchestrator = Orchestrator::new(Arc::new(registry), ConfigHandle::default());
//! orchestrator.start_up(&"web".into())?;
//! ```

pub mod telemetry;

pub use modlife_config as config;
pub use modlife_core as kernel;
pub use modlife_protocols as protocols;

pub use modlife_config::{ConfigError, ConfigHandle, ConfigLoader, ConfigValidator, KernelConfig, LoggingConfig};
pub use modlife_core::{
    ConfiguredDeclarations, ContextGuard, ContextId, DependencyResolver, ExtensionIndex, Orchestrator,
    ResolvedService, ServiceRegistry,
};
pub use modlife_protocols::{
    AmbientScope, DeclarationSource, DependencyCycle, LifecycleError, RestartError, Service, ServiceContext,
    ServiceDescriptor, ServiceError, ServiceFactory, ServiceKey, ServiceLookup, ServiceState,
};
pub use telemetry::init_tracing;
