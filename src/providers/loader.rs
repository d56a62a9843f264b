//! Provider loader for initializing upstreams from configuration

use super::registry::ProviderRegistry;
use super::traits::Provider;
use super::{bestbuy, walmart};
use crate::config::{ProviderConfig, Settings};
use crate::images::ImageUrls;
use crate::network::HttpClient;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for initializing providers from configuration
pub struct ProviderLoader;

impl ProviderLoader {
    /// Load all enabled providers and the per-country upstream sets
    pub fn load(settings: &Settings, client: &HttpClient, images: &ImageUrls) -> Result<ProviderRegistry> {
        let mut registry = ProviderRegistry::new(&settings.search.default_country);

        for config in &settings.providers {
            if config.disabled {
                info!("Skipping disabled provider: {}", config.name);
                continue;
            }

            match Self::create_provider(config, client, images) {
                Ok(provider) => {
                    info!("Loaded provider: {} ({})", config.name, config.provider);
                    registry.register(provider, config.clone());
                }
                Err(e) => {
                    warn!("Failed to load provider {}: {}", config.name, e);
                }
            }
        }

        for (country, upstreams) in &settings.countries {
            for name in upstreams.iter().filter(|n| !registry.contains(n)) {
                warn!("Country {} lists unavailable upstream {}", country, name);
            }
            registry.set_country(country, upstreams.clone());
        }

        info!("Loaded {} providers", registry.len());
        Ok(registry)
    }

    /// Create a provider instance by adapter kind
    fn create_provider(
        config: &ProviderConfig,
        client: &HttpClient,
        images: &ImageUrls,
    ) -> Result<Arc<dyn Provider>> {
        let provider: Box<dyn Provider> = match config.provider.as_str() {
            "walmart" => Box::new(walmart::Walmart::new(config, client.clone(), images.clone())),
            "bestbuy" => Box::new(bestbuy::BestBuy::new(config, client.clone(), images.clone())),
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown provider type: {} (available: {})",
                    other,
                    Self::available_providers().join(", ")
                ));
            }
        };

        if provider.name() != config.name {
            return Err(anyhow::anyhow!(
                "provider type {} serves {}, not {}",
                config.provider,
                provider.name(),
                config.name
            ));
        }
        if provider.about().require_api_key && config.api_key.is_none() {
            warn!("Provider {} has no API key configured", config.name);
        }

        provider.validate(config)?;

        Ok(Arc::from(provider))
    }

    /// Get list of available provider types
    pub fn available_providers() -> Vec<&'static str> {
        vec!["walmart", "bestbuy"]
    }
}
