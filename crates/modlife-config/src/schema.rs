//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Root configuration of the service kernel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Enabled feature flags. Conditional dependencies apply while their flag is listed here.
    #[serde(default)]
    pub flags: BTreeSet<String>,

    /// Per-service declarations, keyed by service key.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceSection>,

    /// Services started by `start_configured`, in order.
    #[serde(default)]
    pub autostart: Vec<String>,

    /// Service whose shutdown invalidates the dependency bookkeeping of everything above it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_root: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KernelConfig {
    /// Whether the given flag is enabled.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Configuration section of a service, if any.
    pub fn service(&self, key: &str) -> Option<&ServiceSection> {
        self.services.get(key)
    }
}

/// Configuration-declared settings of a single service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Additional dependencies on top of the ones the service declares itself.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Overrides the extension relation declared by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "modlife.log".to_string()
}
