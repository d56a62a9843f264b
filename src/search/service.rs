//! Cache-aside front of the aggregator

use super::executor::Aggregator;
use crate::cache::{cache_key, TtlCache};
use crate::config::CacheSettings;
use crate::error::GatewayError;
use crate::offers::{DetailRequest, ListRequest, OfferDetail, OfferList};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Canonical form of every search without a keyword
const TRENDING: &str = "trending";

/// Validates requests, serves cached answers and fills the cache on a miss
pub struct OfferService {
    engine: Arc<Aggregator>,
    cache: Arc<dyn TtlCache>,
    cache_enabled: bool,
    expiration: Duration,
}

impl OfferService {
    pub fn new(engine: Arc<Aggregator>, cache: Arc<dyn TtlCache>, settings: &CacheSettings) -> Self {
        Self {
            engine,
            cache,
            cache_enabled: settings.enabled,
            expiration: Duration::from_secs(settings.expiration_seconds),
        }
    }

    pub fn engine(&self) -> &Arc<Aggregator> {
        &self.engine
    }

    /// Search offers, answering from the cache when possible
    pub async fn search(&self, request: &ListRequest) -> Result<OfferList, GatewayError> {
        let params = request.to_params()?;
        let key = cache_key(&Self::canonical_search(request)?);

        if let Some(list) = self.cached::<OfferList>(&key).await {
            debug!("Search cache hit {}", key);
            return Ok(list);
        }

        let list = self.engine.search(&params).await?;
        self.store(&key, &list).await?;
        Ok(list)
    }

    /// Offer detail with competitor prices, answering from the cache when possible
    pub async fn detail(&self, request: &DetailRequest) -> Result<OfferDetail, GatewayError> {
        let id_type = request.validate()?;
        let canonical = serde_json::to_string(request).map_err(|e| GatewayError::internal(e.to_string()))?;
        let key = cache_key(&canonical);

        if let Some(detail) = self.cached::<OfferDetail>(&key).await {
            debug!("Detail cache hit {}", key);
            return Ok(detail);
        }

        let country = Some(request.country.as_str()).filter(|c| !c.trim().is_empty());
        let detail = self
            .engine
            .detail(request.id.trim(), id_type, request.source.trim(), country)
            .await?
            .ok_or(GatewayError::NotFound)?;

        self.store(&key, &detail).await?;
        Ok(detail)
    }

    /// Deterministic string identifying a search request.
    ///
    /// Keyword searches use the request's JSON form. Every search without a
    /// keyword shares the single trending entry.
    pub fn canonical_search(request: &ListRequest) -> Result<String, GatewayError> {
        if request.keyword_phrase().is_empty() {
            return Ok(TRENDING.to_string());
        }
        serde_json::to_string(request).map_err(|e| GatewayError::internal(e.to_string()))
    }

    /// Decoded cache entry; backend errors and undecodable entries are misses
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.cache_enabled {
            return None;
        }
        let bytes = match self.cache.get(key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), GatewayError> {
        if !self.cache_enabled {
            return Ok(());
        }
        let bytes = serde_json::to_vec(value).map_err(|e| GatewayError::internal(e.to_string()))?;
        if let Err(e) = self.cache.set(key, bytes, self.expiration).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
        Ok(())
    }
}
