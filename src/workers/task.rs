//! Units of work dispatched to the worker pool
//!
//! A [`Job`] pairs a [`Task`] with its parameter map and a single-use result
//! conduit. Running a job consumes it, so each conduit is written at most once.

use crate::error::TaskError;
use crate::offers::{params, IdType, OfferDetail, OfferList};
use crate::providers::{Provider, SearchParams};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;

/// Value produced by a successful task
#[derive(Debug, Clone, PartialEq)]
pub enum JobValue {
    Offers(OfferList),
    Detail(Box<OfferDetail>),
}

/// Single outcome of a task
pub type JobResult = Result<JobValue, TaskError>;

/// Parameter map handed to a task
pub type TaskParams = HashMap<String, String>;

/// A unit of work with a uniform run contract
#[async_trait]
pub trait Task: Send + Sync {
    /// Upstream this task talks to
    fn upstream(&self) -> &str;

    /// Run the task and produce a value or an error
    async fn run(&self, params: &TaskParams) -> JobResult;
}

/// Search one upstream
pub struct SearchTask {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl SearchTask {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

#[async_trait]
impl Task for SearchTask {
    fn upstream(&self) -> &str {
        self.provider.name()
    }

    async fn run(&self, map: &TaskParams) -> JobResult {
        let search = SearchParams::from_map(map);
        let name = self.provider.name().to_string();

        match timeout(self.timeout, self.provider.search(&search)).await {
            Ok(Ok(list)) => Ok(JobValue::Offers(list)),
            Ok(Err(e)) => Err(TaskError::Upstream {
                provider: name,
                message: e.to_string(),
            }),
            Err(_) => Err(TaskError::Timeout(name)),
        }
    }
}

/// Look up one offer on one upstream.
///
/// Expects `id`, `idType` and `country` in the parameter map. An upstream
/// that has no such item fails the task with [`TaskError::NotFound`].
pub struct DetailTask {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl DetailTask {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Parameter map for a detail lookup
    pub fn params(id: &str, id_type: IdType, country: &str) -> TaskParams {
        let mut map = HashMap::new();
        map.insert(params::ID.to_string(), id.to_string());
        map.insert(params::ID_TYPE.to_string(), id_type.to_string());
        map.insert(params::COUNTRY.to_string(), country.to_string());
        map
    }
}

#[async_trait]
impl Task for DetailTask {
    fn upstream(&self) -> &str {
        self.provider.name()
    }

    async fn run(&self, map: &TaskParams) -> JobResult {
        let name = self.provider.name().to_string();
        let id = map.get(params::ID).map(String::as_str).unwrap_or_default();
        let country = map.get(params::COUNTRY).map(String::as_str).unwrap_or_default();
        let id_type: IdType = map
            .get(params::ID_TYPE)
            .map(String::as_str)
            .unwrap_or(params::ID)
            .parse()
            .map_err(|e: crate::error::GatewayError| TaskError::Upstream {
                provider: name.clone(),
                message: e.to_string(),
            })?;

        match timeout(self.timeout, self.provider.get_detail(id, id_type, country)).await {
            Ok(Ok(Some(detail))) => Ok(JobValue::Detail(Box::new(detail))),
            Ok(Ok(None)) => Err(TaskError::NotFound(name)),
            Ok(Err(e)) => Err(TaskError::Upstream {
                provider: name,
                message: e.to_string(),
            }),
            Err(_) => Err(TaskError::Timeout(name)),
        }
    }
}

/// A task bound to its parameters and result conduit
pub struct Job {
    task: Box<dyn Task>,
    params: TaskParams,
    conduit: oneshot::Sender<JobResult>,
}

impl Job {
    /// Create a job and the receiving end of its result conduit
    pub fn new(task: Box<dyn Task>, params: TaskParams) -> (Self, oneshot::Receiver<JobResult>) {
        let (conduit, receiver) = oneshot::channel();
        (
            Self {
                task,
                params,
                conduit,
            },
            receiver,
        )
    }

    pub fn upstream(&self) -> &str {
        self.task.upstream()
    }

    /// Run the task and write its outcome to the conduit.
    ///
    /// A panic inside the task is converted into [`TaskError::Panicked`].
    pub async fn execute(self) {
        let Job {
            task,
            params,
            conduit,
        } = self;

        let result = AssertUnwindSafe(task.run(&params))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(TaskError::Panicked(panic_message(panic.as_ref()))));

        if conduit.send(result).is_err() {
            debug!("Result receiver for {} went away", task.upstream());
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offers::Offer;
    use crate::providers::stub::StubProvider;

    #[tokio::test]
    async fn test_search_task_success() {
        let provider = Arc::new(StubProvider::new("walmart.com").with_offers(3, 30));
        let (job, rx) = Job::new(
            Box::new(SearchTask::new(provider.clone(), Duration::from_secs(1))),
            HashMap::from([("name".to_string(), "tv".to_string())]),
        );
        job.execute().await;

        match rx.await.unwrap() {
            Ok(JobValue::Offers(list)) => assert_eq!(list.len(), 3),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(provider.last_params().unwrap().keyword, "tv");
    }

    #[tokio::test]
    async fn test_search_task_error_and_timeout() {
        let failing = Arc::new(StubProvider::new("bestbuy.com").failing("HTTP error: 500"));
        let result = SearchTask::new(failing, Duration::from_secs(1))
            .run(&TaskParams::new())
            .await;
        assert_eq!(
            result,
            Err(TaskError::Upstream {
                provider: "bestbuy.com".to_string(),
                message: "HTTP error: 500".to_string(),
            })
        );

        let slow = Arc::new(StubProvider::new("ebay.com").with_delay(Duration::from_millis(500)));
        let result = SearchTask::new(slow, Duration::from_millis(20))
            .run(&TaskParams::new())
            .await;
        assert_eq!(result, Err(TaskError::Timeout("ebay.com".to_string())));
    }

    #[tokio::test]
    async fn test_panicking_task_reports_error() {
        let provider = Arc::new(StubProvider::new("amazon.com").panicking());
        let (job, rx) = Job::new(
            Box::new(SearchTask::new(provider, Duration::from_secs(1))),
            TaskParams::new(),
        );
        job.execute().await;

        assert!(matches!(rx.await.unwrap(), Err(TaskError::Panicked(msg)) if msg.contains("amazon.com")));
    }

    #[tokio::test]
    async fn test_detail_task() {
        let detail = OfferDetail::new(Offer::new("1", "Widget", "bestbuy.com"));
        let provider = Arc::new(StubProvider::new("bestbuy.com").with_detail("093155171244", detail));
        let task = DetailTask::new(provider, Duration::from_secs(1));

        let found = task
            .run(&DetailTask::params("093155171244", IdType::Upc, "usa"))
            .await;
        assert!(matches!(found, Ok(JobValue::Detail(d)) if d.offer.id == "1"));

        let missing = task.run(&DetailTask::params("1", IdType::Upc, "usa")).await;
        assert_eq!(missing, Err(TaskError::NotFound("bestbuy.com".to_string())));
    }
}
