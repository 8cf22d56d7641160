//! # modlife Config
//!
//! Configuration management for the modlife service kernel.

mod error;
mod handle;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use handle::ConfigHandle;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
