//! Application state shared across handlers

use crate::config::Settings;
use crate::metrics::Metrics;
use crate::search::OfferService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Cached offer search
    pub service: Arc<OfferService>,
    /// Upstream call statistics
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(settings: Arc<Settings>, service: Arc<OfferService>) -> Self {
        let metrics = service.engine().metrics().clone();
        Self {
            settings,
            service,
            metrics,
        }
    }

    /// Rows per page of the landing page's trending list
    pub fn default_rows_per_page(&self) -> i64 {
        self.settings.search.default_rows_per_page
    }
}
