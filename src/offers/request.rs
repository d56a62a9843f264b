//! Incoming search and detail requests

use super::params;
use super::types::NameValue;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Sortable offer fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Price,
    Rating,
    NumReviews,
}

impl SortField {
    /// Parse a `sortBy` value; unknown or empty values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "rating" => Some(Self::Rating),
            "numReviews" => Some(Self::NumReviews),
            _ => None,
        }
    }
}

/// Sort direction, descending unless "asc" is requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }

    /// Whether a raw `sortOrder` value passes validation
    pub fn is_valid(value: &str) -> bool {
        matches!(value, "" | "asc" | "desc")
    }
}

/// Kind of identifier used for a detail lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdType {
    Id,
    Upc,
    Ean,
    Isbn,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => params::ID,
            Self::Upc => params::UPC,
            Self::Ean => params::EAN,
            Self::Isbn => params::ISBN,
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            params::ID => Ok(Self::Id),
            params::UPC => Ok(Self::Upc),
            params::EAN => Ok(Self::Ean),
            params::ISBN => Ok(Self::Isbn),
            other => Err(GatewayError::invalid(format!("unknown idType '{}'", other))),
        }
    }
}

/// Paged search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRequest {
    /// Filter columns; `name` carries the keyword phrase, `country` the market
    pub search_columns: Vec<NameValue>,
    pub sort_by: String,
    pub sort_order: String,
    pub page: i64,
    pub rows_per_page: i64,
}

impl ListRequest {
    /// Keyword search request
    pub fn keyword(keyword: impl Into<String>, page: i64, rows_per_page: i64) -> Self {
        Self {
            search_columns: vec![NameValue::new(params::NAME, keyword)],
            page,
            rows_per_page,
            ..Default::default()
        }
    }

    /// Request with no keyword, which searches trending offers
    pub fn trending(rows_per_page: i64) -> Self {
        Self {
            page: 1,
            rows_per_page,
            ..Default::default()
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.search_columns.push(NameValue::new(name, value));
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self.sort_order = sort_order.into();
        self
    }

    /// Check paging and sort order
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.page <= 0 {
            return Err(GatewayError::invalid("page must be positive"));
        }
        if self.rows_per_page <= 0 {
            return Err(GatewayError::invalid("rowsPerPage must be positive"));
        }
        if !SortOrder::is_valid(&self.sort_order) {
            return Err(GatewayError::invalid(format!(
                "sortOrder must be 'asc' or 'desc', got '{}'",
                self.sort_order
            )));
        }
        Ok(())
    }

    /// Value of a search column (last one wins)
    pub fn column(&self, name: &str) -> Option<&str> {
        self.search_columns
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Trimmed keyword phrase, empty for trending searches
    pub fn keyword_phrase(&self) -> &str {
        self.column(params::NAME).map(str::trim).unwrap_or("")
    }

    pub fn country(&self) -> Option<&str> {
        self.column(params::COUNTRY).filter(|c| !c.trim().is_empty())
    }

    /// Validate and flatten into the parameter map handed to upstream tasks
    pub fn to_params(&self) -> Result<HashMap<String, String>, GatewayError> {
        self.validate()?;

        let mut map: HashMap<String, String> = self
            .search_columns
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect();
        map.insert(params::PAGE.to_string(), self.page.to_string());
        map.insert(params::ROWS_PER_PAGE.to_string(), self.rows_per_page.to_string());
        map.insert(params::SORT_BY.to_string(), self.sort_by.clone());
        map.insert(params::SORT_ORDER.to_string(), self.sort_order.clone());
        Ok(map)
    }
}

/// Single-offer detail request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailRequest {
    pub id: String,
    pub id_type: String,
    /// Upstream name the id belongs to
    pub source: String,
    pub country: String,
}

impl DetailRequest {
    pub fn new(
        id: impl Into<String>,
        id_type: impl Into<String>,
        source: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            id_type: id_type.into(),
            source: source.into(),
            country: country.into(),
        }
    }

    /// Check required fields and return the parsed id type
    pub fn validate(&self) -> Result<IdType, GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::invalid("id is required"));
        }
        if self.source.trim().is_empty() {
            return Err(GatewayError::invalid("source is required"));
        }
        self.id_type.parse()
    }
}
