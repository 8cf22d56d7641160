//! Common types shared across the kernel.

mod key;

pub use key::ServiceKey;
