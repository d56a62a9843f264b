//! Settings structures for offer-gateway configuration

use crate::offers::{countries, marketplaces};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main settings structure, loaded from settings.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub pool: PoolSettings,
    pub cache: CacheSettings,
    pub outgoing: OutgoingSettings,
    pub images: ImageSettings,
    pub providers: Vec<ProviderConfig>,
    /// Upstream names enabled per country code
    pub countries: HashMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            server: ServerSettings::default(),
            search: SearchSettings::default(),
            pool: PoolSettings::default(),
            cache: CacheSettings::default(),
            outgoing: OutgoingSettings::default(),
            images: ImageSettings::default(),
            providers: default_providers(),
            countries: default_countries(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (OFFER_GATEWAY_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("OFFER_GATEWAY_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("OFFER_GATEWAY_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("OFFER_GATEWAY_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Ok(val) = std::env::var("OFFER_GATEWAY_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.pool.workers = workers;
            }
        }
        if let Ok(val) = std::env::var("OFFER_GATEWAY_CACHE_ENABLED") {
            self.cache.enabled = val.parse().unwrap_or(self.cache.enabled);
        }
    }

    /// Get provider config by upstream name
    /// Get all enabled providers
    pub fn enabled_providers(&self) -> Vec<&ProviderConfig> {
        self.providers.iter().filter(|p| !p.disabled).collect()
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Instance name reported by the health endpoint
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "offer-gateway".to_string(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Rows per page for the trending index
    pub default_rows_per_page: i64,
    /// Country used when a request names none (or an unknown one)
    pub default_country: String,
    /// Initial capacity of an aggregated offer list
    pub offer_list_capacity: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_rows_per_page: 10,
            default_country: countries::UNITED_STATES.to_string(),
            offer_list_capacity: 100,
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Number of workers, 0 = number of available cores
    pub workers: usize,
}

impl PoolSettings {
    /// Effective worker count
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Expiration of cached search and detail responses
    pub expiration_seconds: u64,
    /// Maximum number of cached entries
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            expiration_seconds: 3600,
            max_capacity: 10_000,
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// Proxy settings
    pub proxies: ProxySettings,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 5.0,
            pool_maxsize: 20,
            proxies: ProxySettings::default(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Image URL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Public base URL of this gateway, used for local assets
    pub host_url: String,
    /// Image proxy endpoint for upstreams serving plain http images
    pub proxy_host: String,
    /// Secret used to sign proxied image URLs
    pub proxy_secret: String,
    /// Fallback when an offer has no image
    pub placeholder: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            host_url: "http://localhost:8080".to_string(),
            proxy_host: "http://localhost:8080/img".to_string(),
            proxy_secret: String::new(),
            placeholder: "image-placeholder.png".to_string(),
        }
    }
}

/// Individual upstream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Upstream name (unique identifier, e.g. "walmart.com")
    pub name: String,
    /// Adapter to use ("walmart", "bestbuy")
    pub provider: String,
    /// API base URL
    pub endpoint: String,
    pub api_key: Option<String>,
    pub affiliate_id: Option<String>,
    /// Minimum interval between two calls to this upstream
    pub wait_interval_ms: u64,
    /// Results per upstream page
    pub page_size: u32,
    /// Custom timeout in seconds for this upstream
    pub timeout: Option<f64>,
    /// Route images through the signing proxy
    pub image_proxy: bool,
    /// Logo file under the local assets folder
    pub logo: String,
    pub disabled: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            provider: String::new(),
            endpoint: String::new(),
            api_key: None,
            affiliate_id: None,
            wait_interval_ms: 1000,
            page_size: 10,
            timeout: None,
            image_proxy: false,
            logo: String::new(),
            disabled: false,
        }
    }
}

/// Default provider configurations
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: marketplaces::WALMART.to_string(),
            provider: "walmart".to_string(),
            endpoint: "http://api.walmartlabs.com/v1".to_string(),
            image_proxy: true,
            logo: "walmart-logo.png".to_string(),
            ..Default::default()
        },
        ProviderConfig {
            name: marketplaces::BEST_BUY.to_string(),
            provider: "bestbuy".to_string(),
            endpoint: "https://api.bestbuy.com/v1".to_string(),
            page_size: 12,
            logo: "best-buy-logo.png".to_string(),
            ..Default::default()
        },
    ]
}

/// Default upstream sets per country
fn default_countries() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        countries::UNITED_STATES.to_string(),
        vec![
            marketplaces::WALMART.to_string(),
            marketplaces::BEST_BUY.to_string(),
        ],
    );
    map.insert(
        countries::CANADA.to_string(),
        vec![marketplaces::WALMART.to_string()],
    );
    map
}
