//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::KernelConfig;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &KernelConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_flags(config, &mut result);
        Self::validate_services(config, &mut result);
        Self::validate_autostart(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_flags(config: &KernelConfig, result: &mut ValidationResult) {
        if config.flags.iter().any(|flag| flag.trim().is_empty()) {
            result.add_error(ValidationError::new("flags", "Flag names cannot be empty"));
        }
    }

    fn validate_services(config: &KernelConfig, result: &mut ValidationResult) {
        for (key, section) in &config.services {
            let path = format!("services.{}", key);

            if section.dependencies.iter().any(|dep| dep == key) {
                result.add_error(ValidationError::new(
                    format!("{}.dependencies", path),
                    format!("Service '{}' cannot depend on itself", key),
                ));
            }

            if section.dependencies.iter().any(|dep| dep.is_empty()) {
                result.add_error(ValidationError::new(
                    format!("{}.dependencies", path),
                    "Dependency keys cannot be empty",
                ));
            }

            if section.extends.as_deref() == Some(key.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.extends", path),
                    format!("Service '{}' cannot extend itself", key),
                ));
            }

            if section.dependencies.is_empty() && section.extends.is_none() {
                result.add_warning(ValidationWarning::new(
                    path,
                    "Service section declares nothing and has no effect",
                ));
            }
        }
    }

    fn validate_autostart(config: &KernelConfig, result: &mut ValidationResult) {
        for (i, key) in config.autostart.iter().enumerate() {
            if config.autostart[..i].contains(key) {
                result.add_warning(ValidationWarning::new(
                    "autostart",
                    format!("Service '{}' is listed more than once", key),
                ));
            }
        }

        if let Some(root) = &config.configuration_root {
            if root.is_empty() {
                result.add_error(ValidationError::new(
                    "configuration_root",
                    "Configuration root cannot be empty",
                ));
            }
        }
    }

    fn validate_logging(config: &KernelConfig, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }

        if config.logging.directory.is_some() && config.logging.file_prefix.is_empty() {
            result.add_error(ValidationError::new(
                "logging.file_prefix",
                "file_prefix is required when logging to a directory",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
