//! Search execution and orchestration

use super::ranking::Ranking;
use crate::error::GatewayError;
use crate::metrics::Metrics;
use crate::monitor::AdmissionMonitor;
use crate::offers::{params, IdType, OfferDetail, OfferList};
use crate::providers::{Provider, ProviderRegistry};
use crate::workers::{fan_in, DetailTask, JobResult, JobValue, SearchTask, Task, TaskParams, WorkerPool};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Upstream name and dispatch time of a queued task
type Dispatched = ((String, Instant), oneshot::Receiver<JobResult>);

/// Aggregator that fans a request out to every upstream of a country
pub struct Aggregator {
    /// Upstream providers
    registry: Arc<ProviderRegistry>,
    /// Per-upstream call gate
    monitor: Arc<AdmissionMonitor>,
    /// Pool running the upstream calls
    pool: Arc<WorkerPool>,
    metrics: Arc<Metrics>,
    /// Timeout for providers without a configured one
    default_timeout: Duration,
    /// Initial capacity of aggregated lists
    capacity: usize,
}

impl Aggregator {
    /// Create a new aggregator
    pub fn new(
        registry: Arc<ProviderRegistry>,
        monitor: Arc<AdmissionMonitor>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            registry,
            monitor,
            pool,
            metrics: Arc::new(Metrics::new()),
            default_timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT),
            capacity: 100,
        }
    }

    /// Set default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Country code requests will actually be served for
    fn resolve_country(&self, country: Option<&str>) -> String {
        self.registry.resolve_country(country).to_string()
    }

    fn timeout_for(&self, name: &str) -> Duration {
        let seconds = self
            .registry
            .get_timeout(name, self.default_timeout.as_secs_f64());
        Duration::try_from_secs_f64(seconds).unwrap_or(self.default_timeout)
    }

    /// Queue one task per admitted upstream.
    ///
    /// Unregistered upstreams and upstreams the admission monitor denies are
    /// skipped without error.
    async fn dispatch<F>(
        &self,
        upstreams: Vec<String>,
        task_params: &TaskParams,
        make_task: F,
    ) -> Result<Vec<Dispatched>, GatewayError>
    where
        F: Fn(Arc<dyn Provider>, Duration) -> Box<dyn Task>,
    {
        let mut dispatched = Vec::with_capacity(upstreams.len());

        for name in upstreams {
            let Some(provider) = self.registry.get(&name) else {
                debug!("Skipping unregistered upstream {}", name);
                continue;
            };
            if !self.monitor.is_available(&name) {
                debug!("Upstream {} is rate limited, skipping", name);
                self.metrics.record_denial(&name);
                continue;
            }

            let task = make_task(provider.clone(), self.timeout_for(&name));
            let started = Instant::now();
            let receiver = self.pool.dispatch(task, task_params.clone()).await?;
            self.metrics.record_call(&name);
            dispatched.push(((name, started), receiver));
        }

        Ok(dispatched)
    }

    /// Search every upstream of the requested country and rank the merged list.
    ///
    /// Upstream errors and empty answers are logged and left out. When every
    /// upstream fails the result is an empty list with a zero total.
    pub async fn search(&self, search_params: &TaskParams) -> Result<OfferList, GatewayError> {
        self.metrics.inc_search();

        let requested = search_params.get(params::COUNTRY).map(String::as_str);
        let country = self.resolve_country(requested);
        let upstreams = self.registry.upstreams_for_country(Some(&country));

        let mut task_params = search_params.clone();
        task_params.insert(params::COUNTRY.to_string(), country.clone());

        let dispatched = self
            .dispatch(upstreams, &task_params, |provider, timeout| {
                Box::new(SearchTask::new(provider, timeout))
            })
            .await?;

        info!("Searching {} upstreams for country {}", dispatched.len(), country);

        let mut aggregate = OfferList::with_capacity(self.capacity);
        let mut results = fan_in(dispatched);
        while let Some(((name, started), result)) = results.next().await {
            match result {
                Ok(JobValue::Offers(partial)) => {
                    self.metrics
                        .record_success(&name, started.elapsed().as_millis() as u64);
                    let count = partial.len();
                    if aggregate.merge(partial) {
                        debug!("Upstream {} contributed {} offers", name, count);
                    } else {
                        debug!("Upstream {} returned no offers", name);
                    }
                }
                Ok(other) => {
                    self.metrics.record_error(&name);
                    warn!("Unexpected search result from {}: {:?}", name, other);
                }
                Err(e) => {
                    self.metrics.record_error(&name);
                    warn!("Dropping results from {}: {}", name, e);
                }
            }
        }

        let keyword = search_params
            .get(params::NAME)
            .map(String::as_str)
            .unwrap_or_default();
        let ranking = Ranking::select(
            search_params.get(params::SORT_BY).map(String::as_str).unwrap_or_default(),
            search_params.get(params::SORT_ORDER).map(String::as_str).unwrap_or_default(),
            keyword,
        );
        ranking.apply(&mut aggregate.list, &mut rand::thread_rng());

        Ok(aggregate)
    }

    /// Look up one offer and collect competitor prices by UPC.
    ///
    /// `Ok(None)` means the source upstream produced nothing. Competitors
    /// that are denied, fail or have no such UPC are left out.
    pub async fn detail(
        &self,
        id: &str,
        id_type: IdType,
        source: &str,
        country: Option<&str>,
    ) -> Result<Option<OfferDetail>, GatewayError> {
        self.metrics.inc_detail();
        let country = self.resolve_country(country);

        let primary = self
            .lookup(
                vec![source.to_string()],
                &DetailTask::params(id, id_type, &country),
            )
            .await?;
        let Some(mut detail) = primary.into_iter().next() else {
            info!("No detail for {} {} on {}", id_type, id, source);
            return Ok(None);
        };

        if !detail.has_upc() {
            return Ok(Some(detail));
        }

        let upc = detail.offer.upc.trim().to_string();
        let competitors: Vec<String> = self
            .registry
            .upstreams_for_country(Some(&country))
            .into_iter()
            .filter(|name| name != source)
            .collect();

        for competitor in self
            .lookup(competitors, &DetailTask::params(&upc, IdType::Upc, &country))
            .await?
        {
            detail.add_competitor(&competitor.offer);
        }

        debug!(
            "Detail {} has {} competitor prices",
            id,
            detail.product_detail_items.len()
        );
        Ok(Some(detail))
    }

    /// Run detail tasks and collect the found items in completion order
    async fn lookup(
        &self,
        upstreams: Vec<String>,
        task_params: &TaskParams,
    ) -> Result<Vec<OfferDetail>, GatewayError> {
        let dispatched = self
            .dispatch(upstreams, task_params, |provider, timeout| {
                Box::new(DetailTask::new(provider, timeout))
            })
            .await?;

        let mut found = Vec::with_capacity(dispatched.len());
        let mut results = fan_in(dispatched);
        while let Some(((name, started), result)) = results.next().await {
            match result {
                Ok(JobValue::Detail(detail)) => {
                    self.metrics
                        .record_success(&name, started.elapsed().as_millis() as u64);
                    found.push(*detail);
                }
                Ok(other) => {
                    self.metrics.record_error(&name);
                    warn!("Unexpected detail result from {}: {:?}", name, other);
                }
                Err(e) => {
                    self.metrics.record_error(&name);
                    debug!("No detail from {}: {}", name, e);
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::offers::{ListRequest, Offer};
    use crate::providers::stub::StubProvider;

    const UPSTREAMS: [&str; 4] = ["walmart.com", "bestbuy.com", "ebay.com", "amazon.com"];

    struct Fixture {
        aggregator: Aggregator,
        stubs: Vec<Arc<StubProvider>>,
    }

    fn fixture(stubs: Vec<StubProvider>, wait_interval_ms: u64) -> Fixture {
        let stubs: Vec<Arc<StubProvider>> = stubs.into_iter().map(Arc::new).collect();
        let mut registry = ProviderRegistry::new("usa");
        for stub in &stubs {
            registry.register(
                stub.clone(),
                ProviderConfig {
                    name: stub.name().to_string(),
                    ..Default::default()
                },
            );
        }
        registry.set_country("usa", UPSTREAMS.iter().map(|s| s.to_string()).collect());
        registry.set_country("can", vec!["walmart.com".to_string()]);

        let monitor = AdmissionMonitor::new(UPSTREAMS.iter().map(|name| (*name, wait_interval_ms)));
        let aggregator = Aggregator::new(
            Arc::new(registry),
            Arc::new(monitor),
            Arc::new(WorkerPool::new(4)),
        )
        .with_timeout(Duration::from_secs(2));

        Fixture { aggregator, stubs }
    }

    fn with_upc(party: &str, id: &str, price: f64) -> OfferDetail {
        OfferDetail::new(
            Offer::new(id, "Skyrim Special Edition (Xbox One)", party)
                .with_upc("093155171244")
                .with_price(price),
        )
    }

    #[tokio::test]
    async fn test_trending_tolerates_failed_upstream() {
        let f = fixture(
            vec![
                StubProvider::new("walmart.com").with_offers(3, 30),
                StubProvider::new("bestbuy.com").with_offers(2, 20),
                StubProvider::new("ebay.com").failing("HTTP error: 503"),
                StubProvider::new("amazon.com").with_offers(4, 40),
            ],
            0,
        );

        let params = ListRequest::trending(10).to_params().unwrap();
        let list = f.aggregator.search(&params).await.unwrap();

        assert_eq!(list.len(), 9);
        assert_eq!(list.summary.total_count, 90);
        assert_eq!(list.summary.page_count, 3);
        assert!(f.stubs.iter().all(|s| s.search_calls() == 1));

        let stats = f.aggregator.metrics().snapshot().providers["ebay.com"].clone();
        assert_eq!(stats.errors, 1);
    }

    #[tokio::test]
    async fn test_merge_ignores_completion_order() {
        let mut expected = OfferList::with_capacity(8);
        expected.merge(StubProvider::new("walmart.com").with_offers(3, 30).answer());
        expected.merge(StubProvider::new("ebay.com").with_offers(2, 20).answer());
        let mut expected_ids: Vec<String> = expected.list.iter().map(|o| o.id.clone()).collect();
        expected_ids.sort();

        let orders: [[u64; 3]; 6] = [
            [0, 40, 80],
            [0, 80, 40],
            [40, 0, 80],
            [40, 80, 0],
            [80, 0, 40],
            [80, 40, 0],
        ];
        for [a, b, c] in orders {
            let f = fixture(
                vec![
                    StubProvider::new("walmart.com")
                        .with_offers(3, 30)
                        .with_delay(Duration::from_millis(a)),
                    StubProvider::new("bestbuy.com")
                        .failing("HTTP error: 500")
                        .with_delay(Duration::from_millis(b)),
                    StubProvider::new("ebay.com")
                        .with_offers(2, 20)
                        .with_delay(Duration::from_millis(c)),
                ],
                0,
            );

            let params = ListRequest::trending(10).with_sort("id", "asc").to_params().unwrap();
            let list = f.aggregator.search(&params).await.unwrap();

            let ids: Vec<String> = list.list.iter().map(|o| o.id.clone()).collect();
            assert_eq!(ids, expected_ids, "delays {:?}", [a, b, c]);
            assert_eq!(list.summary, expected.summary, "delays {:?}", [a, b, c]);
        }
    }

    #[tokio::test]
    async fn test_all_upstreams_failing_yields_empty_list() {
        let f = fixture(
            vec![
                StubProvider::new("walmart.com").failing("down"),
                StubProvider::new("bestbuy.com").panicking(),
            ],
            0,
        );

        let params = ListRequest::keyword("tv", 1, 10).to_params().unwrap();
        let list = f.aggregator.search(&params).await.unwrap();
        assert!(list.is_empty());
        assert_eq!(list.summary.total_count, 0);
    }

    #[tokio::test]
    async fn test_field_sort_and_country() {
        let f = fixture(
            vec![
                StubProvider::new("walmart.com").with_offers(3, 3),
                StubProvider::new("bestbuy.com").with_offers(3, 3),
            ],
            0,
        );

        let params = ListRequest::keyword("tv", 1, 10)
            .with_column(params::COUNTRY, "can")
            .with_sort("price", "asc")
            .to_params()
            .unwrap();
        let list = f.aggregator.search(&params).await.unwrap();

        // canada only lists walmart
        assert_eq!(list.len(), 3);
        assert_eq!(f.stubs[1].search_calls(), 0);
        let prices: Vec<f64> = list.list.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![0.0, 1.0, 2.0]);
        assert_eq!(f.stubs[0].last_params().unwrap().country, "can");
    }

    #[tokio::test]
    async fn test_denied_upstreams_contribute_nothing() {
        let f = fixture(
            vec![
                StubProvider::new("walmart.com").with_offers(2, 2),
                StubProvider::new("bestbuy.com").with_offers(2, 2),
            ],
            60_000,
        );
        let params = ListRequest::trending(10).to_params().unwrap();

        assert_eq!(f.aggregator.search(&params).await.unwrap().len(), 4);
        let second = f.aggregator.search(&params).await.unwrap();

        assert!(second.is_empty());
        assert!(f.stubs.iter().all(|s| s.search_calls() == 1));
        let stats = f.aggregator.metrics().snapshot().providers["walmart.com"].clone();
        assert_eq!(stats.denials, 1);
    }

    #[tokio::test]
    async fn test_detail_collects_competitors() {
        let f = fixture(
            vec![
                StubProvider::new("walmart.com")
                    .with_detail("53966162", with_upc("walmart.com", "53966162", 39.99)),
                StubProvider::new("bestbuy.com")
                    .with_detail("093155171244", with_upc("bestbuy.com", "1219460", 29.99)),
                StubProvider::new("ebay.com"),
                StubProvider::new("amazon.com").failing("HTTP error: 500"),
            ],
            0,
        );

        let detail = f
            .aggregator
            .detail("53966162", IdType::Id, "walmart.com", None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detail.offer.id, "53966162");
        assert_eq!(detail.product_detail_items.len(), 1);
        assert_eq!(detail.product_detail_items[0].party_name, "bestbuy.com");
        assert_eq!(detail.product_detail_items[0].price, 29.99);
        // one primary lookup, no competitor lookup against the source
        assert_eq!(f.stubs[0].detail_calls(), 1);
        assert!(f.stubs[1..].iter().all(|s| s.detail_calls() == 1));
    }

    #[tokio::test]
    async fn test_detail_without_upc_skips_fan_out() {
        let detail = OfferDetail::new(Offer::new("1", "Widget", "walmart.com"));
        let f = fixture(
            vec![
                StubProvider::new("walmart.com").with_detail("1", detail),
                StubProvider::new("bestbuy.com"),
            ],
            0,
        );

        let found = f
            .aggregator
            .detail("1", IdType::Id, "walmart.com", Some("usa"))
            .await
            .unwrap()
            .unwrap();
        assert!(found.product_detail_items.is_empty());
        assert_eq!(f.stubs[1].detail_calls(), 0);
    }

    #[tokio::test]
    async fn test_detail_missing_primary() {
        let f = fixture(vec![StubProvider::new("walmart.com")], 0);

        let missing = f
            .aggregator
            .detail("404", IdType::Id, "walmart.com", None)
            .await
            .unwrap();
        assert!(missing.is_none());

        let unknown = f
            .aggregator
            .detail("1", IdType::Id, "target.com", None)
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_stopped_pool_is_internal_error() {
        let f = fixture(vec![StubProvider::new("walmart.com").with_offers(1, 1)], 0);
        f.aggregator.pool.stop().await;

        let params = ListRequest::trending(10).to_params().unwrap();
        let result = f.aggregator.search(&params).await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));
    }
}
