//! Offer type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized marketplace listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Upstream-native identifier, usable for detail lookups
    pub id: String,
    /// Secondary upstream identifier (SKU, parent item id)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    /// Universal product code, empty when the upstream has none
    #[serde(default)]
    pub upc: String,
    /// Display name
    pub name: String,
    /// Upstream the offer came from (e.g. "walmart.com")
    pub party_name: String,
    /// Deep link to the offer on the upstream site
    #[serde(default)]
    pub semantic_name: String,
    /// Product image
    #[serde(default)]
    pub main_image_file_url: String,
    /// Upstream logo
    #[serde(default)]
    pub party_image_file_url: String,
    /// Category label
    #[serde(default)]
    pub product_category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_reviews: u32,
}

impl Offer {
    /// Create a new offer with the required fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, party_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_id: String::new(),
            upc: String::new(),
            name: name.into(),
            party_name: party_name.into(),
            semantic_name: String::new(),
            main_image_file_url: String::new(),
            party_image_file_url: String::new(),
            product_category: String::new(),
            price: 0.0,
            rating: 0.0,
            num_reviews: 0,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = external_id.into();
        self
    }

    pub fn with_upc(mut self, upc: impl Into<String>) -> Self {
        self.upc = upc.into();
        self
    }

    /// Set the deep link URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.semantic_name = url.into();
        self
    }

    /// Set product image and upstream logo
    pub fn with_images(mut self, image: impl Into<String>, logo: impl Into<String>) -> Self {
        self.main_image_file_url = image.into();
        self.party_image_file_url = logo.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.product_category = category.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Set rating and review count
    pub fn with_reviews(mut self, rating: f64, num_reviews: u32) -> Self {
        self.rating = rating;
        self.num_reviews = num_reviews;
        self
    }
}

/// Paging summary of an offer list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub page: u32,
    pub page_count: u32,
    pub total_count: u64,
}

/// An ordered list of offers plus its summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferList {
    pub list: Vec<Offer>,
    pub summary: Summary,
}

impl OfferList {
    pub fn new(list: Vec<Offer>, page: u32, page_count: u32, total_count: u64) -> Self {
        Self {
            list,
            summary: Summary {
                page,
                page_count,
                total_count,
            },
        }
    }

    /// Empty aggregate used as the starting point of a merge
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
            summary: Summary {
                page: 1,
                page_count: 0,
                total_count: 0,
            },
        }
    }

    /// Append a partial result to this aggregate.
    ///
    /// Partial lists that report no results are ignored. This is the only
    /// place where `page_count` and `total_count` change.
    pub fn merge(&mut self, partial: OfferList) -> bool {
        if partial.summary.total_count == 0 {
            return false;
        }
        self.list.extend(partial.list);
        self.summary.total_count += partial.summary.total_count;
        self.summary.page_count += partial.summary.page_count;
        true
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// A name/value pair (search columns, product attributes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Build a sorted list of pairs from a map
    pub fn from_map(map: BTreeMap<String, String>) -> Vec<Self> {
        map.into_iter().map(|(name, value)| Self { name, value }).collect()
    }
}

/// A competitor's price snapshot for the same physical product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetailItem {
    pub party_name: String,
    pub semantic_name: String,
    pub party_image_file_url: String,
    pub price: f64,
    pub rating: f64,
    pub num_reviews: u32,
}

impl From<&Offer> for OfferDetailItem {
    fn from(offer: &Offer) -> Self {
        Self {
            party_name: offer.party_name.clone(),
            semantic_name: offer.semantic_name.clone(),
            party_image_file_url: offer.party_image_file_url.clone(),
            price: offer.price,
            rating: offer.rating,
            num_reviews: offer.num_reviews,
        }
    }
}

/// Expanded detail of a single offer with competitor snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetail {
    pub offer: Offer,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<NameValue>,
    #[serde(default)]
    pub product_detail_items: Vec<OfferDetailItem>,
}

impl OfferDetail {
    pub fn new(offer: Offer) -> Self {
        Self {
            offer,
            description: String::new(),
            attributes: Vec::new(),
            product_detail_items: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = NameValue::from_map(attributes);
        self
    }

    /// Record a competitor snapshot taken from another upstream's offer
    pub fn add_competitor(&mut self, offer: &Offer) {
        self.product_detail_items.push(OfferDetailItem::from(offer));
    }

    /// Whether a competitor lookup by UPC is possible
    pub fn has_upc(&self) -> bool {
        !self.offer.upc.trim().is_empty()
    }
}
