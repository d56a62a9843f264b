//! Provider registry for managing upstream marketplaces

use super::traits::Provider;
use crate::config::ProviderConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all loaded upstream providers
pub struct ProviderRegistry {
    /// Providers by upstream name
    providers: HashMap<String, Arc<dyn Provider>>,
    /// Provider configurations
    configs: HashMap<String, ProviderConfig>,
    /// Upstream names enabled per country
    countries: HashMap<String, Vec<String>>,
    /// Country used for empty or unknown country codes
    default_country: String,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new(default_country: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            configs: HashMap::new(),
            countries: HashMap::new(),
            default_country: default_country.into(),
        }
    }

    /// Register a provider under its upstream name
    pub fn register(&mut self, provider: Arc<dyn Provider>, config: ProviderConfig) {
        let name = provider.name().to_string();
        self.providers.insert(name.clone(), provider);
        self.configs.insert(name, config);
    }

    /// Set the upstream names enabled for a country
    pub fn set_country(&mut self, country: impl Into<String>, upstreams: Vec<String>) {
        self.countries.insert(country.into(), upstreams);
    }

    /// Get a provider by upstream name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(name)
    }

    /// Resolve a requested country code, falling back to the default
    pub fn resolve_country<'a>(&'a self, country: Option<&'a str>) -> &'a str {
        match country.map(str::trim) {
            Some(c) if self.countries.contains_key(c) => c,
            _ => &self.default_country,
        }
    }

    /// Upstream names configured for a country, in configuration order.
    ///
    /// Names that have no registered provider are kept; callers skip them.
    pub fn upstreams_for_country(&self, country: Option<&str>) -> Vec<String> {
        let country = self.resolve_country(country);
        self.countries.get(country).cloned().unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Get effective timeout for a provider in seconds
    pub fn get_timeout(&self, name: &str, default: f64) -> f64 {
        self.configs
            .get(name)
            .and_then(|c| c.timeout)
            .or_else(|| self.providers.get(name).map(|p| p.timeout()))
            .unwrap_or(default)
    }
}
