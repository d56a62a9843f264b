//! Provider traits and types

use crate::config::ProviderConfig;
use crate::offers::{params, IdType, OfferDetail, OfferList};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for a provider search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Keyword phrase, empty for trending
    pub keyword: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Country code
    pub country: String,
}

impl SearchParams {
    /// Create new search parameters for a keyword
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            page: 1,
            country: String::new(),
        }
    }

    /// Parameters for a trending (no keyword) search
    pub fn trending() -> Self {
        Self::new("")
    }

    /// Read normalized parameters from a task parameter map
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            keyword: map
                .get(params::NAME)
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
            page: map
                .get(params::PAGE)
                .and_then(|p| p.parse().ok())
                .filter(|p| *p > 0)
                .unwrap_or(1),
            country: map.get(params::COUNTRY).cloned().unwrap_or_default(),
        }
    }

    /// Whether this is a keyword search (as opposed to trending)
    pub fn is_keyword_search(&self) -> bool {
        !self.keyword.is_empty()
    }
}

/// Provider metadata
#[derive(Debug, Clone, Default)]
pub struct ProviderAbout {
    /// Whether an API key is required
    pub require_api_key: bool,
}

impl ProviderAbout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key_required(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }
}

/// Main trait every upstream marketplace adapter implements.
///
/// Implementations are shared across worker tasks and must tolerate
/// concurrent calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Upstream name (e.g. "walmart.com")
    fn name(&self) -> &str;

    /// Short description of the provider
    fn about(&self) -> ProviderAbout {
        ProviderAbout::default()
    }

    /// Default timeout in seconds
    fn timeout(&self) -> f64 {
        5.0
    }

    /// Search offers by keyword, or trending offers for an empty keyword
    async fn search(&self, params: &SearchParams) -> anyhow::Result<OfferList>;

    /// Look up a single offer by id or product code.
    ///
    /// `Ok(None)` means the upstream answered but has no such item.
    async fn get_detail(
        &self,
        id: &str,
        id_type: IdType,
        country: &str,
    ) -> anyhow::Result<Option<OfferDetail>>;

    /// Optional validation of configuration
    fn validate(&self, _config: &ProviderConfig) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_map() {
        let mut map = HashMap::new();
        map.insert("name".to_string(), "  skyrim ".to_string());
        map.insert("page".to_string(), "3".to_string());
        map.insert("country".to_string(), "can".to_string());

        let params = SearchParams::from_map(&map);
        assert_eq!(params.keyword, "skyrim");
        assert_eq!(params.page, 3);
        assert_eq!(params.country, "can");
        assert!(params.is_keyword_search());
    }

    #[test]
    fn test_params_defaults() {
        let mut map = HashMap::new();
        map.insert("page".to_string(), "-2".to_string());

        let params = SearchParams::from_map(&map);
        assert_eq!(params, SearchParams::trending());
        assert!(!params.is_keyword_search());
    }
}
