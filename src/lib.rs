//! offer-gateway: a federated product-search gateway
//!
//! Fans a search out to several marketplace APIs through a bounded worker
//! pool, merges and ranks the answers, and caches the composite result.

pub mod cache;
pub mod config;
pub mod error;
pub mod images;
pub mod metrics;
pub mod monitor;
pub mod network;
pub mod offers;
pub mod providers;
pub mod search;
pub mod web;
pub mod workers;

pub use config::Settings;
pub use error::GatewayError;
pub use offers::{DetailRequest, ListRequest, Offer, OfferDetail, OfferList};
pub use providers::Provider;
pub use search::{Aggregator, OfferService};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for upstream requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 5;
