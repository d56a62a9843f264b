//! Search orchestration module
//!
//! Fans requests out to the upstream providers, merges and ranks their
//! answers, and caches the composite result.

mod executor;
pub mod ranking;
mod service;

pub use executor::Aggregator;
pub use ranking::Ranking;
pub use service::OfferService;
