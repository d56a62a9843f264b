//! Walmart Open API provider
//!
//! Keyword searches go to `/search`, trending offers to `/trends` and detail
//! lookups to `/items`. Walmart serves plain http images, which are routed
//! through the image proxy when the provider config asks for it.

use super::traits::*;
use crate::config::ProviderConfig;
use crate::images::ImageUrls;
use crate::network::HttpClient;
use crate::offers::{marketplaces, IdType, Offer, OfferDetail, OfferList};
use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    item_id: u64,
    #[serde(default)]
    parent_item_id: Option<u64>,
    #[serde(default)]
    upc: String,
    name: String,
    #[serde(default)]
    sale_price: f64,
    #[serde(default)]
    category_path: String,
    #[serde(default)]
    long_description: String,
    #[serde(default)]
    large_image: String,
    #[serde(default)]
    product_tracking_url: String,
    /// Served as a string, e.g. "4.5"
    #[serde(default, alias = "CustomerRating")]
    customer_rating: String,
    #[serde(default)]
    num_reviews: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    start: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Walmart marketplace provider
pub struct Walmart {
    client: HttpClient,
    images: ImageUrls,
    endpoint: String,
    api_key: String,
    affiliate_id: String,
    page_size: u32,
    image_proxy: bool,
    logo: String,
    timeout: Duration,
}

impl Walmart {
    pub fn new(config: &ProviderConfig, client: HttpClient, images: ImageUrls) -> Self {
        let timeout = config
            .timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| client.default_timeout());
        Self {
            client,
            images,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            affiliate_id: config.affiliate_id.clone().unwrap_or_default(),
            page_size: config.page_size.max(1),
            image_proxy: config.image_proxy,
            logo: config.logo.clone(),
            timeout,
        }
    }

    /// Query parameters sent with every call
    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", "json".to_string()),
            ("apiKey", self.api_key.clone()),
            ("lsPublisherId", self.affiliate_id.clone()),
        ]
    }

    /// First result index for a 1-indexed page
    fn start_index(&self, page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(self.page_size) + 1
    }

    fn to_offer(&self, item: &SearchItem) -> Offer {
        let rating = item.customer_rating.trim().parse::<f64>().unwrap_or(0.0);
        let mut offer = Offer::new(item.item_id.to_string(), &item.name, marketplaces::WALMART)
            .with_upc(&item.upc)
            .with_url(&item.product_tracking_url)
            .with_images(
                self.images.external(&item.large_image, self.image_proxy),
                self.images.local(&self.logo),
            )
            .with_category(&item.category_path)
            .with_price(item.sale_price)
            .with_reviews(rating, item.num_reviews);

        if let Some(parent) = item.parent_item_id.filter(|p| *p != item.item_id) {
            offer = offer.with_external_id(parent.to_string());
        }
        offer
    }

    fn to_detail(&self, item: &SearchItem) -> OfferDetail {
        OfferDetail::new(self.to_offer(item)).with_description(strip_html(&item.long_description))
    }

    async fn keyword_search(&self, params: &SearchParams) -> Result<OfferList> {
        let url = format!("{}/search", self.endpoint);
        let mut query = self.base_params();
        query.push(("query", params.keyword.clone()));
        query.push(("start", self.start_index(params.page).to_string()));

        let response: SearchResponse = self.client.get_json(&url, &query, self.timeout).await?;
        let list: Vec<Offer> = response.items.iter().map(|i| self.to_offer(i)).collect();
        let page_size = u64::from(self.page_size);

        debug!("Walmart search '{}' returned {} items", params.keyword, list.len());
        Ok(OfferList::new(
            list,
            page_number(response.start / page_size + 1),
            page_number(response.total_results / page_size),
            response.total_results,
        ))
    }

    async fn trending(&self, params: &SearchParams) -> Result<OfferList> {
        let url = format!("{}/trends", self.endpoint);
        let response: ItemsResponse = self
            .client
            .get_json(&url, &self.base_params(), self.timeout)
            .await?;
        let list: Vec<Offer> = response.items.iter().map(|i| self.to_offer(i)).collect();
        let total = list.len() as u64;

        Ok(OfferList::new(
            list,
            params.page,
            page_number(total / u64::from(self.page_size)),
            total,
        ))
    }

    async fn detail_by_id(&self, id: &str) -> Result<Option<OfferDetail>> {
        let url = format!("{}/items/{}", self.endpoint, urlencoding::encode(id));
        let response = self
            .client
            .get_with_timeout(&url, &self.base_params(), self.timeout)
            .await?;

        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(anyhow::anyhow!("HTTP error: {}", response.status));
        }
        let item: SearchItem = response.json()?;
        Ok(Some(self.to_detail(&item)))
    }

    async fn detail_by_upc(&self, upc: &str) -> Result<Option<OfferDetail>> {
        let url = format!("{}/items", self.endpoint);
        let mut query = self.base_params();
        query.push(("upc", upc.to_string()));

        let response = self
            .client
            .get_with_timeout(&url, &query, self.timeout)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(anyhow::anyhow!("HTTP error: {}", response.status));
        }
        let items: ItemsResponse = response.json()?;
        Ok(items.items.first().map(|item| self.to_detail(item)))
    }
}

#[async_trait]
impl Provider for Walmart {
    fn name(&self) -> &str {
        marketplaces::WALMART
    }

    fn about(&self) -> ProviderAbout {
        ProviderAbout::new().api_key_required(true)
    }

    fn timeout(&self) -> f64 {
        self.timeout.as_secs_f64()
    }

    async fn search(&self, params: &SearchParams) -> Result<OfferList> {
        if params.is_keyword_search() {
            self.keyword_search(params).await
        } else {
            self.trending(params).await
        }
    }

    async fn get_detail(&self, id: &str, id_type: IdType, _country: &str) -> Result<Option<OfferDetail>> {
        match id_type {
            IdType::Id => self.detail_by_id(id).await,
            IdType::Upc => self.detail_by_upc(id).await,
            IdType::Ean | IdType::Isbn => {
                debug!("Walmart has no lookup by {}", id_type);
                Ok(None)
            }
        }
    }

    fn validate(&self, config: &ProviderConfig) -> Result<()> {
        url::Url::parse(&config.endpoint)
            .map_err(|e| anyhow::anyhow!("invalid Walmart endpoint '{}': {}", config.endpoint, e))?;
        Ok(())
    }
}

/// Visible text of an HTML fragment
fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.concat().trim().to_string()
}

fn page_number(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
