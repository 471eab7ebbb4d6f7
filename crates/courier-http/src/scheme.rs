//! Scheme registry

use crate::config::SchemeSupport;
use tracing::debug;

/// A URL scheme the facade will dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    pub name: &'static str,
    pub default_port: u16,
}

impl Scheme {
    pub const HTTP: Scheme = Scheme {
        name: "http",
        default_port: 80,
    };

    pub const HTTPS: Scheme = Scheme {
        name: "https",
        default_port: 443,
    };
}

/// Ordered set of registered schemes
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    schemes: Vec<Scheme>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding the schemes selected by `support`
    pub fn with_support(support: SchemeSupport) -> Self {
        let mut registry = Self::new();
        if matches!(support, SchemeSupport::Http | SchemeSupport::Both) {
            registry.register(Scheme::HTTP);
        }
        if matches!(support, SchemeSupport::Https | SchemeSupport::Both) {
            registry.register(Scheme::HTTPS);
        }
        registry
    }

    /// Register a scheme. Returns `false` if one with the same name was
    /// already present.
    pub fn register(&mut self, scheme: Scheme) -> bool {
        if self.get(scheme.name).is_some() {
            debug!(scheme = scheme.name, "Scheme already registered");
            return false;
        }
        debug!(scheme = scheme.name, port = scheme.default_port, "Scheme registered");
        self.schemes.push(scheme);
        true
    }

    /// Look up a scheme by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Scheme> {
        self.schemes
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn supports(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True when `https` is the only registered scheme
    pub fn https_only(&self) -> bool {
        self.supports("https") && !self.supports("http")
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.schemes.iter().map(|s| s.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = SchemeRegistry::new();
        assert!(registry.register(Scheme::HTTP));
        assert!(!registry.register(Scheme::HTTP));
        assert_eq!(registry.names(), vec!["http"]);
    }

    #[test]
    fn test_both_registers_https_after_http() {
        let registry = SchemeRegistry::with_support(SchemeSupport::Both);
        assert_eq!(registry.names(), vec!["http", "https"]);
        assert!(!registry.https_only());
    }

    #[test]
    fn test_https_only() {
        let registry = SchemeRegistry::with_support(SchemeSupport::Https);
        assert!(registry.https_only());
        assert!(!registry.supports("http"));
        assert_eq!(registry.get("HTTPS").map(|s| s.default_port), Some(443));
    }
}
