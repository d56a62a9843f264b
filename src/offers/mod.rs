//! Offer model and request types
//!
//! Normalized listings shared by every upstream, plus the search and detail
//! requests accepted at the aggregation boundary.

mod request;
mod types;

pub use request::*;
pub use types::*;

/// Parameter keys used in task parameter maps and search columns
pub mod params {
    pub const NAME: &str = "name";
    pub const COUNTRY: &str = "country";
    pub const PAGE: &str = "page";
    pub const ROWS_PER_PAGE: &str = "rowsPerPage";
    pub const SORT_BY: &str = "sortBy";
    pub const SORT_ORDER: &str = "sortOrder";
    pub const ID: &str = "id";
    pub const ID_TYPE: &str = "idType";
    pub const UPC: &str = "upc";
    pub const EAN: &str = "ean";
    pub const ISBN: &str = "isbn";
}

/// Country codes
pub mod countries {
    pub const UNITED_STATES: &str = "usa";
    pub const CANADA: &str = "can";
}

/// Known upstream marketplace names
pub mod marketplaces {
    pub const WALMART: &str = "walmart.com";
    pub const BEST_BUY: &str = "bestbuy.com";
    pub const EBAY: &str = "ebay.com";
    pub const AMAZON: &str = "amazon.com";
}
