//! In-process provider with canned answers and call counters

use super::traits::{Provider, SearchParams};
use crate::offers::{IdType, Offer, OfferDetail, OfferList};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Behavior of a stub search
#[derive(Debug, Clone)]
enum Answer {
    List(OfferList),
    Fail(String),
    Panic,
}

pub struct StubProvider {
    name: String,
    search: Answer,
    details: HashMap<String, OfferDetail>,
    delay: Option<Duration>,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    last_params: Mutex<Option<SearchParams>>,
}

impl StubProvider {
    /// Provider returning an empty list and no details
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search: Answer::List(OfferList::default()),
            details: HashMap::new(),
            delay: None,
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }

    /// Answer searches with `count` offers and the given total
    pub fn with_offers(mut self, count: usize, total: u64) -> Self {
        let list = (0..count)
            .map(|i| {
                Offer::new(format!("{}-{}", self.name, i), format!("item {}", i), &self.name)
                    .with_price(i as f64)
            })
            .collect();
        self.search = Answer::List(OfferList::new(list, 1, 1, total));
        self
    }

    /// The list searches are answered with, empty for failing stubs
    pub fn answer(&self) -> OfferList {
        match &self.search {
            Answer::List(list) => list.clone(),
            _ => OfferList::default(),
        }
    }

    pub fn with_list(mut self, list: OfferList) -> Self {
        self.search = Answer::List(list);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.search = Answer::Fail(message.into());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.search = Answer::Panic;
        self
    }

    /// Serve a detail for the given id or UPC
    pub fn with_detail(mut self, key: impl Into<String>, detail: OfferDetail) -> Self {
        self.details.insert(key.into(), detail);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<SearchParams> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, params: &SearchParams) -> anyhow::Result<OfferList> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.search {
            Answer::List(list) => Ok(list.clone()),
            Answer::Fail(message) => Err(anyhow::anyhow!("{}", message)),
            Answer::Panic => panic!("stub provider {} panicked", self.name),
        }
    }

    async fn get_detail(
        &self,
        id: &str,
        _id_type: IdType,
        _country: &str,
    ) -> anyhow::Result<Option<OfferDetail>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Answer::Fail(message) = &self.search {
            return Err(anyhow::anyhow!("{}", message));
        }
        Ok(self.details.get(id).cloned())
    }
}
