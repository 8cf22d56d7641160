//! Service declarations and the traits implemented by services.

mod context;
mod declaration;
mod descriptor;
mod scope;
mod traits;

pub use context::{ServiceContext, ServiceLookup};
pub use declaration::DeclarationSource;
pub use descriptor::{ConditionalDependency, ServiceDescriptor};
pub use scope::AmbientScope;
pub use traits::{downcast_instance, Service, ServiceFactory};

/// Activation state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// No instance exists.
    Inactive,
    /// Instance constructed, startup hook running.
    Starting,
    /// Startup hook completed.
    Active,
    /// Shutdown hook running.
    Stopping,
}

impl ServiceState {
    /// Whether an instance exists.
    pub fn is_active(self) -> bool {
        !matches!(self, ServiceState::Inactive)
    }
}
