//! Error types for the modlife protocol layer.

mod lifecycle;
mod service;

pub use lifecycle::*;
pub use service::*;
