//! Metrics collection module
//!
//! Tracks upstream call outcomes, admission denials and response times.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Response times kept per upstream
const RESPONSE_WINDOW: usize = 100;

#[derive(Debug, Default)]
struct ProviderCounters {
    calls: u64,
    successes: u64,
    errors: u64,
    denials: u64,
    response_times: Vec<u64>,
}

/// Gateway metrics collector
pub struct Metrics {
    /// Total search requests served by the engine
    total_searches: AtomicU64,
    /// Total detail requests served by the engine
    total_details: AtomicU64,
    providers: RwLock<HashMap<String, ProviderCounters>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_searches: AtomicU64::new(0),
            total_details: AtomicU64::new(0),
            providers: RwLock::new(HashMap::new()),
        }
    }

    pub fn inc_search(&self) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_detail(&self) {
        self.total_details.fetch_add(1, Ordering::Relaxed);
    }

    fn update(&self, provider: &str, f: impl FnOnce(&mut ProviderCounters)) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        f(providers.entry(provider.to_string()).or_default());
    }

    /// Record a call dispatched to an upstream
    pub fn record_call(&self, provider: &str) {
        self.update(provider, |c| c.calls += 1);
    }

    /// Record an upstream call refused by the admission monitor
    pub fn record_denial(&self, provider: &str) {
        self.update(provider, |c| c.denials += 1);
    }

    /// Record a successful upstream result and its response time
    pub fn record_success(&self, provider: &str, time_ms: u64) {
        self.update(provider, |c| {
            c.successes += 1;
            if c.response_times.len() >= RESPONSE_WINDOW {
                c.response_times.remove(0);
            }
            c.response_times.push(time_ms);
        });
    }

    pub fn record_error(&self, provider: &str) {
        self.update(provider, |c| c.errors += 1);
    }

    pub fn get_total_searches(&self) -> u64 {
        self.total_searches.load(Ordering::Relaxed)
    }

    pub fn get_total_details(&self) -> u64 {
        self.total_details.load(Ordering::Relaxed)
    }

    /// Statistics of every upstream seen so far
    pub fn snapshot(&self) -> MetricsSnapshot {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        MetricsSnapshot {
            total_searches: self.get_total_searches(),
            total_details: self.get_total_details(),
            providers: providers
                .iter()
                .map(|(name, counters)| (name.clone(), ProviderStats::from(counters)))
                .collect(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a single upstream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub calls: u64,
    pub successes: u64,
    pub errors: u64,
    pub denials: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}

impl From<&ProviderCounters> for ProviderStats {
    fn from(c: &ProviderCounters) -> Self {
        let avg_response_time = if c.response_times.is_empty() {
            None
        } else {
            Some(c.response_times.iter().sum::<u64>() / c.response_times.len() as u64)
        };
        let finished = c.successes + c.errors;
        let reliability = if finished == 0 {
            100.0
        } else {
            (c.successes as f64 / finished as f64) * 100.0
        };

        Self {
            calls: c.calls,
            successes: c.successes,
            errors: c.errors,
            denials: c.denials,
            avg_response_time,
            reliability,
        }
    }
}

/// Point-in-time view served by the stats endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_searches: u64,
    pub total_details: u64,
    pub providers: HashMap<String, ProviderStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.inc_search();
        metrics.record_call("walmart.com");
        metrics.record_success("walmart.com", 100);
        metrics.record_call("walmart.com");
        metrics.record_success("walmart.com", 300);
        metrics.record_call("walmart.com");
        metrics.record_error("walmart.com");
        metrics.record_denial("bestbuy.com");

        assert_eq!(metrics.get_total_searches(), 1);
        let walmart = metrics.snapshot().providers["walmart.com"].clone();
        assert_eq!(walmart.calls, 3);
        assert_eq!(walmart.avg_response_time, Some(200));
        assert!((walmart.reliability - 66.666).abs() < 0.01);

        let bestbuy = metrics.snapshot().providers["bestbuy.com"].clone();
        assert_eq!(bestbuy.denials, 1);
        assert_eq!(bestbuy.reliability, 100.0);
    }

    #[test]
    fn test_response_window_is_bounded() {
        let metrics = Metrics::new();
        for i in 0..150 {
            metrics.record_success("walmart.com", i);
        }
        // only 50..150 remain
        let stats = metrics.snapshot().providers["walmart.com"].clone();
        assert_eq!(stats.avg_response_time, Some(99));
        assert_eq!(metrics.snapshot().providers.len(), 1);
    }
}
