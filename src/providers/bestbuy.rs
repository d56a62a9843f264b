//! Best Buy Products API provider
//!
//! Best Buy encodes keyword filters in the resource path, e.g.
//! `products((search=deals&search=of&search=the&search=day))`.

use super::traits::*;
use crate::config::ProviderConfig;
use crate::images::ImageUrls;
use crate::network::HttpClient;
use crate::offers::{marketplaces, IdType, Offer, OfferDetail, OfferList};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Fields requested for list and detail calls
const LIST_FIELDS: &str = "productId,upc,sku,name,salePrice,url,image,manufacturer,\
customerReviewAverage,customerReviewCount,categoryPath";

/// Category label of trending offers
const SPECIAL_OFFER: &str = "special offer";

const MANUFACTURER: &str = "manufacturer";

#[derive(Debug, Deserialize)]
struct CategoryPath {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    product_id: u64,
    #[serde(default)]
    upc: Option<String>,
    #[serde(default)]
    sku: Option<u64>,
    name: String,
    #[serde(default)]
    sale_price: f64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    manufacturer: Option<String>,
    #[serde(default)]
    customer_review_average: Option<f64>,
    #[serde(default)]
    customer_review_count: Option<u32>,
    #[serde(default)]
    category_path: Vec<CategoryPath>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductsResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    current_page: u32,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Default, Deserialize)]
struct TrendingNames {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrendingLinks {
    #[serde(default)]
    web: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrendingImages {
    #[serde(default)]
    standard: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrendingPrices {
    #[serde(default)]
    current: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingReviews {
    #[serde(default)]
    average_score: Option<f64>,
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingItem {
    sku: String,
    #[serde(default)]
    names: TrendingNames,
    #[serde(default)]
    links: TrendingLinks,
    #[serde(default)]
    images: TrendingImages,
    #[serde(default)]
    prices: TrendingPrices,
    #[serde(default)]
    customer_reviews: TrendingReviews,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSet {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingMetadata {
    #[serde(default)]
    result_set: ResultSet,
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    metadata: TrendingMetadata,
    #[serde(default)]
    results: Vec<TrendingItem>,
}

/// Best Buy marketplace provider
pub struct BestBuy {
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

impl BestBuy {
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

    fn base_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", "json".to_string()),
            ("apiKey", self.api_key.clone()),
            ("LID", self.affiliate_id.clone()),
        ]
    }

    fn to_offer(&self, product: &Product) -> Offer {
        let category: Vec<&str> = product
            .category_path
            .iter()
            .map(|c| c.name.as_str())
            .collect();

        let mut offer = Offer::new(product.product_id.to_string(), &product.name, marketplaces::BEST_BUY)
            .with_upc(product.upc.clone().unwrap_or_default())
            .with_url(&product.url)
            .with_images(
                self.images
                    .external(product.image.as_deref().unwrap_or_default(), self.image_proxy),
                self.images.local(&self.logo),
            )
            .with_category(category.join("-"))
            .with_price(product.sale_price)
            .with_reviews(
                product.customer_review_average.unwrap_or(0.0),
                product.customer_review_count.unwrap_or(0),
            );

        if let Some(sku) = product.sku {
            offer = offer.with_external_id(sku.to_string());
        }
        offer
    }

    fn trending_offer(&self, item: &TrendingItem) -> Offer {
        Offer::new(&item.sku, &item.names.title, marketplaces::BEST_BUY)
            .with_external_id(&item.sku)
            .with_url(&item.links.web)
            .with_images(
                self.images.external(&item.images.standard, self.image_proxy),
                self.images.local(&self.logo),
            )
            .with_category(SPECIAL_OFFER)
            .with_price(item.prices.current)
            .with_reviews(
                item.customer_reviews.average_score.unwrap_or(0.0),
                item.customer_reviews.count.unwrap_or(0),
            )
    }

    async fn keyword_search(&self, params: &SearchParams) -> Result<OfferList> {
        let url = format!("{}/products{}", self.endpoint, search_path(&params.keyword));
        let mut query = self.base_params();
        query.push(("show", LIST_FIELDS.to_string()));
        query.push(("page", params.page.to_string()));
        query.push(("pageSize", self.page_size.to_string()));

        let response: ProductsResponse = self.client.get_json(&url, &query, self.timeout).await?;
        let list: Vec<Offer> = response.products.iter().map(|p| self.to_offer(p)).collect();

        debug!("Best Buy search '{}' returned {} items", params.keyword, list.len());
        Ok(OfferList::new(
            list,
            response.current_page.max(1),
            response.total_pages,
            response.total,
        ))
    }

    async fn trending(&self) -> Result<OfferList> {
        let url = format!("{}/products/trendingViewed", self.endpoint);
        let response: TrendingResponse = self
            .client
            .get_json(&url, &self.base_params(), self.timeout)
            .await?;
        let list: Vec<Offer> = response
            .results
            .iter()
            .map(|i| self.trending_offer(i))
            .collect();

        // Trending results are a single page
        Ok(OfferList::new(list, 1, 1, response.metadata.result_set.count))
    }
}

#[async_trait]
impl Provider for BestBuy {
    fn name(&self) -> &str {
        marketplaces::BEST_BUY
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
            self.trending().await
        }
    }

    async fn get_detail(&self, id: &str, id_type: IdType, _country: &str) -> Result<Option<OfferDetail>> {
        let attribute = match id_type {
            IdType::Id => "productId",
            IdType::Upc => "upc",
            IdType::Ean | IdType::Isbn => {
                debug!("Best Buy has no lookup by {}", id_type);
                return Ok(None);
            }
        };

        let url = format!(
            "{}/products({}={})",
            self.endpoint,
            attribute,
            urlencoding::encode(id)
        );
        let mut query = self.base_params();
        query.push(("show", LIST_FIELDS.to_string()));

        let response: ProductsResponse = self.client.get_json(&url, &query, self.timeout).await?;
        let Some(product) = response.products.first() else {
            return Ok(None);
        };

        let mut attributes = BTreeMap::new();
        if let Some(manufacturer) = product.manufacturer.as_ref().filter(|m| !m.is_empty()) {
            attributes.insert(MANUFACTURER.to_string(), manufacturer.clone());
        }

        Ok(Some(OfferDetail::new(self.to_offer(product)).with_attributes(attributes)))
    }

    fn validate(&self, config: &ProviderConfig) -> Result<()> {
        url::Url::parse(&config.endpoint)
            .map_err(|e| anyhow::anyhow!("invalid Best Buy endpoint '{}': {}", config.endpoint, e))?;
        Ok(())
    }
}

/// Build the keyword filter of a products path.
///
/// `"deals of the day"` becomes `((search=deals&search=of&search=the&search=day))`.
fn search_path(keyword: &str) -> String {
    let terms: Vec<String> = keyword
        .split_whitespace()
        .map(|k| format!("search={}", urlencoding::encode(k)))
        .collect();
    format!("(({}))", terms.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRODUCT: &str = r#"{
        "productId": 1219460,
        "upc": "093155171244",
        "sku": 5743209,
        "name": "The Elder Scrolls V: Skyrim Special Edition - Xbox One",
        "salePrice": 29.99,
        "url": "https://api.bestbuy.com/click/-/5743209/pdp",
        "image": "https://pisces.bbystatic.com/image2/5743209_sa.jpg",
        "manufacturer": "Bethesda Softworks",
        "customerReviewAverage": 4.7,
        "customerReviewCount": 310,
        "categoryPath": [{"id": "abcat0700000", "name": "Video Games"}, {"id": "pcmcat", "name": "Xbox One"}]
    }"#;

    fn bestbuy(server: &MockServer) -> BestBuy {
        let config = ProviderConfig {
            name: marketplaces::BEST_BUY.to_string(),
            provider: "bestbuy".to_string(),
            endpoint: format!("{}/v1", server.uri()),
            api_key: Some("key".to_string()),
            page_size: 12,
            logo: "best-buy-logo.png".to_string(),
            ..Default::default()
        };
        BestBuy::new(&config, HttpClient::new().unwrap(), ImageUrls::default())
    }

    #[test]
    fn test_search_path() {
        assert_eq!(
            search_path("deals of  the day"),
            "((search=deals&search=of&search=the&search=day))"
        );
        assert_eq!(search_path("4k&hdr"), "((search=4k%26hdr))");
    }

    #[tokio::test]
    async fn test_keyword_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/products\(\(search=skyrim&search=special\)\)$"))
            .and(query_param("page", "1"))
            .and(query_param("pageSize", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"from": 1, "to": 1, "total": 25, "currentPage": 1, "totalPages": 3, "products": [{}]}}"#,
                PRODUCT
            )))
            .mount(&server)
            .await;

        let list = bestbuy(&server)
            .search(&SearchParams::new("skyrim special"))
            .await
            .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.summary.page_count, 3);
        assert_eq!(list.summary.total_count, 25);

        let offer = &list.list[0];
        assert_eq!(offer.id, "1219460");
        assert_eq!(offer.external_id, "5743209");
        assert_eq!(offer.product_category, "Video Games-Xbox One");
        assert_eq!(offer.num_reviews, 310);
        assert_eq!(offer.main_image_file_url, "https://pisces.bbystatic.com/image2/5743209_sa.jpg");
    }

    #[tokio::test]
    async fn test_trending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/products/trendingViewed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "metadata": {"resultSet": {"count": 1}},
                    "results": [{
                        "sku": "6084400",
                        "names": {"title": "Nintendo Switch"},
                        "links": {"web": "https://www.bestbuy.com/site/6084400"},
                        "images": {"standard": "http://img.bbystatic.com/6084400.jpg"},
                        "prices": {"current": 299.99},
                        "customerReviews": {"averageScore": 4.8, "count": 1200},
                        "rank": 1
                    }]
                }"#,
            ))
            .mount(&server)
            .await;

        let list = bestbuy(&server).search(&SearchParams::trending()).await.unwrap();
        assert_eq!(list.summary.total_count, 1);
        assert_eq!(list.summary.page_count, 1);

        let offer = &list.list[0];
        assert_eq!(offer.name, "Nintendo Switch");
        assert_eq!(offer.product_category, "special offer");
        assert_eq!(offer.main_image_file_url, "https://img.bbystatic.com/6084400.jpg");
    }

    #[tokio::test]
    async fn test_detail_by_upc() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/v1/products\(upc=093155171244\)$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"total": 1, "currentPage": 1, "totalPages": 1, "products": [{}]}}"#,
                PRODUCT
            )))
            .mount(&server)
            .await;

        let detail = bestbuy(&server)
            .get_detail("093155171244", IdType::Upc, "usa")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detail.offer.price, 29.99);
        assert_eq!(detail.attributes.len(), 1);
        assert_eq!(detail.attributes[0].name, "manufacturer");
        assert_eq!(detail.attributes[0].value, "Bethesda Softworks");
    }

    #[tokio::test]
    async fn test_detail_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"total": 0, "currentPage": 1, "totalPages": 0, "products": []}"#,
            ))
            .mount(&server)
            .await;

        let detail = bestbuy(&server).get_detail("1", IdType::Id, "usa").await.unwrap();
        assert!(detail.is_none());
        let detail = bestbuy(&server).get_detail("1", IdType::Isbn, "usa").await.unwrap();
        assert!(detail.is_none());
    }
}
