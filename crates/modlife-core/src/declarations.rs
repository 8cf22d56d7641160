//! Declarations read from descriptors and the live configuration.

use modlife_config::ConfigHandle;
use modlife_protocols::error::LifecycleError;
use modlife_protocols::{DeclarationSource, ServiceDescriptor, ServiceKey};

/// Default [`DeclarationSource`].
///
/// Dependencies are the descriptor's static dependencies, followed by the
/// conditional dependencies whose flag is enabled, followed by the
/// dependencies listed in `services.<key>.dependencies`. The extension
/// relation may be overridden by `services.<key>.extends`.
///
/// The configuration is read on every call, so replacing it through the
/// shared [`ConfigHandle`] changes the graph derived by later resolutions.
#[derive(Debug, Clone)]
pub struct ConfiguredDeclarations {
    config: ConfigHandle,
}

impl ConfiguredDeclarations {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }
}

fn parse_key(owner: &ServiceDescriptor, raw: &str, field: &str) -> Result<ServiceKey, LifecycleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::Configuration {
            service: owner.key().clone(),
            reason: format!("empty service reference in '{field}'"),
        });
    }
    Ok(ServiceKey::new(trimmed))
}

impl DeclarationSource for ConfiguredDeclarations {
    fn dependencies(&self, descriptor: &ServiceDescriptor) -> Result<Vec<ServiceKey>, LifecycleError> {
        self.config.read(|config| -> Result<Vec<ServiceKey>, LifecycleError> {
            let mut result: Vec<ServiceKey> = descriptor.dependencies().to_vec();
            let mut push = |key: ServiceKey| {
                if !result.contains(&key) {
                    result.push(key);
                }
            };

            for conditional in descriptor.conditional_dependencies() {
                if config.is_enabled(&conditional.flag) {
                    push(conditional.service.clone());
                }
            }

            if let Some(section) = config.service(descriptor.key().as_str()) {
                for raw in &section.dependencies {
                    push(parse_key(descriptor, raw, "dependencies")?);
                }
            }

            Ok(result)
        })
    }

    fn extended_service(&self, descriptor: &ServiceDescriptor) -> Result<Option<ServiceKey>, LifecycleError> {
        self.config.read(|config| {
            let configured = config
                .service(descriptor.key().as_str())
                .and_then(|section| section.extends.as_deref());
            match configured {
                Some(raw) => parse_key(descriptor, raw, "extends").map(Some),
                None => Ok(descriptor.extended_service().cloned()),
            }
        })
    }
}
