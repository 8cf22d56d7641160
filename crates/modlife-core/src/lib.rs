//! # modlife Core
//!
//! Lifecycle kernel for singleton services.
//!
//! ## Components
//!
//! - [`ServiceRegistry`] - Descriptors known to the kernel, keyed by service
//! - [`ExtensionIndex`] - Reverse mapping from host services to their extensions
//! - [`DependencyResolver`] - Ordered, cycle-checked start sequences
//! - [`Orchestrator`] - Start/stop, reverse-dependency bookkeeping and queries
//! - [`ContextGuard`] - Scoped startup that shuts down what it started
//!
//! Restart of a service subtree is provided by [`Orchestrator::restart`] and
//! [`Orchestrator::restart_with`].

pub mod context;
pub mod declarations;
pub mod extension;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
mod restart;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ContextGuard, ContextId};
pub use declarations::ConfiguredDeclarations;
pub use extension::ExtensionIndex;
pub use orchestrator::Orchestrator;
pub use registry::ServiceRegistry;
pub use resolver::{DependencyResolver, ResolvedService};
