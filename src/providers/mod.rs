//! Upstream marketplace providers
//!
//! Each provider adapts one marketplace API to the normalized offer model.

pub mod bestbuy;
mod loader;
mod registry;
#[cfg(test)]
pub(crate) mod stub;
mod traits;
pub mod walmart;

pub use loader::ProviderLoader;
pub use registry::ProviderRegistry;
pub use traits::*;
