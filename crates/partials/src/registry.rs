//! Which host integrations this build supports.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use partials_core::PartialsError;

/// A host an engine can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Framework {
    /// A bare engine with no application around it.
    Environment,
    /// Any application exposing a [`partials_lifecycle::Lifecycle`].
    Host,
    /// An axum application.
    Axum,
}

impl Framework {
    /// Every framework, in registration order.
    pub const ALL: [Framework; 3] = [Framework::Environment, Framework::Host, Framework::Axum];

    /// Name used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Host => "host",
            Self::Axum => "axum",
        }
    }

    /// Cargo feature of this crate that provides the integration.
    pub fn feature(&self) -> &'static str {
        match self {
            Self::Environment | Self::Host => "default",
            Self::Axum => "axum",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of an available integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    /// The framework this integration registers with.
    pub framework: Framework,
    /// Crate the host application is written with.
    pub host_crate: &'static str,
    /// Cargo feature that compiles the integration in.
    pub feature: &'static str,
    /// Whether registration binds a worker pool to an application lifecycle.
    pub binds_lifecycle: bool,
}

/// Produces the integration descriptor.
pub type IntegrationFactory = fn() -> Integration;

fn environment_integration() -> Integration {
    Integration {
        framework: Framework::Environment,
        host_crate: "minijinja",
        feature: Framework::Environment.feature(),
        binds_lifecycle: false,
    }
}

fn host_integration() -> Integration {
    Integration {
        framework: Framework::Host,
        host_crate: "partials-lifecycle",
        feature: Framework::Host.feature(),
        binds_lifecycle: true,
    }
}

#[cfg(feature = "axum")]
fn axum_integration() -> Integration {
    Integration {
        framework: Framework::Axum,
        host_crate: "axum",
        feature: Framework::Axum.feature(),
        binds_lifecycle: true,
    }
}

static GLOBAL: Lazy<CapabilityRegistry> = Lazy::new(CapabilityRegistry::detect);

/// Maps each [`Framework`] to a factory, or to nothing when this build lacks
/// the integration.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    entries: BTreeMap<Framework, Option<IntegrationFactory>>,
}

impl CapabilityRegistry {
    /// Registry for the features this crate was compiled with.
    pub fn detect() -> Self {
        let registry = Self::empty()
            .with(Framework::Environment, environment_integration)
            .with(Framework::Host, host_integration);

        #[cfg(feature = "axum")]
        let registry = registry.with(Framework::Axum, axum_integration);

        registry
    }

    /// The process-wide registry, detected once.
    pub fn global() -> &'static CapabilityRegistry {
        &GLOBAL
    }

    /// Registry with every framework unavailable.
    pub fn empty() -> Self {
        Self {
            entries: Framework::ALL.iter().map(|f| (*f, None)).collect(),
        }
    }

    /// Install or replace the factory for `framework`.
    pub fn with(mut self, framework: Framework, factory: IntegrationFactory) -> Self {
        self.entries.insert(framework, Some(factory));
        self
    }

    /// Copy of this registry with `framework` marked unavailable.
    pub fn without(mut self, framework: Framework) -> Self {
        self.entries.insert(framework, None);
        self
    }

    /// Whether an integration is installed for `framework`.
    pub fn is_available(&self, framework: Framework) -> bool {
        matches!(self.entries.get(&framework), Some(Some(_)))
    }

    /// The integration for `framework`, or [`PartialsError::MissingIntegration`].
    pub fn require(&self, framework: Framework) -> Result<Integration, PartialsError> {
        match self.entries.get(&framework) {
            Some(Some(factory)) => Ok(factory()),
            _ => Err(PartialsError::MissingIntegration {
                framework: framework.to_string(),
                feature: framework.feature().to_string(),
            }),
        }
    }

    /// Available frameworks, in [`Framework::ALL`] order.
    pub fn available(&self) -> Vec<Framework> {
        self.entries
            .iter()
            .filter(|(_, factory)| factory.is_some())
            .map(|(framework, _)| *framework)
            .collect()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_detect_has_builtin_integrations() {
        let registry = CapabilityRegistry::detect();
        assert!(registry.is_available(Framework::Environment));
        assert!(registry.is_available(Framework::Host));
        assert_eq!(registry.is_available(Framework::Axum), cfg!(feature = "axum"));
    }

    #[test]
    fn test_without_marks_missing() {
        let registry = CapabilityRegistry::detect().without(Framework::Host);
        match registry.require(Framework::Host) {
            Err(PartialsError::MissingIntegration { framework, feature }) => {
                assert_eq!(framework, "host");
                assert_eq!(feature, "default");
            }
            other => panic!("expected MissingIntegration, got {:?}", other),
        }
        assert!(!registry.available().contains(&Framework::Host));
    }

    #[test]
    fn test_empty_registry() {
        let registry = CapabilityRegistry::empty();
        assert!(registry.available().is_empty());
        assert!(registry.require(Framework::Environment).is_err());
    }

    #[test_case(Framework::Environment, false)]
    #[test_case(Framework::Host, true)]
    fn test_integration_descriptor(framework: Framework, binds_lifecycle: bool) {
        let integration = CapabilityRegistry::detect().require(framework).unwrap();
        assert_eq!(integration.framework, framework);
        assert_eq!(integration.binds_lifecycle, binds_lifecycle);
    }

    #[test]
    fn test_global_is_detected_once() {
        let a = CapabilityRegistry::global() as *const _;
        let b = CapabilityRegistry::global() as *const _;
        assert_eq!(a, b);
        assert_eq!(CapabilityRegistry::global().available(), CapabilityRegistry::detect().available());
    }
}
