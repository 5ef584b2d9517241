//! Search request types for the product search engine.
//!
//! This module defines the request structures used to search the product
//! index: structured facet filters, the requested ordering and pagination.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of results per page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Structured facet filters applied alongside (or instead of) text search.
///
/// Absent fields impose no constraint. `in_stock_only = false` also imposes no
/// constraint; it never restricts results to out-of-stock products.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_tag: Option<String>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl FilterSet {
    /// Create an empty filter set (no constraints).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a category.
    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Restrict to an inclusive price range. Either bound may be omitted.
    pub fn with_price_range(mut self, min_price: Option<f64>, max_price: Option<f64>) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    /// Restrict to a material tag.
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material_tag = Some(material.into());
        self
    }

    /// Restrict to a style tag.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style_tag = Some(style.into());
        self
    }

    /// Only return products currently in stock.
    pub fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    /// Validate the price bounds.
    ///
    /// Returns an error message if a bound is negative or not finite, or if
    /// `min_price > max_price`. Inverted bounds are never silently swapped.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(format!("{} must be a finite number", field));
                }
                if value < 0.0 {
                    return Err(format!("{} must be non-negative, got {}", field, value));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(format!(
                    "min_price ({}) must not exceed max_price ({})",
                    min, max
                ));
            }
        }

        Ok(())
    }
}

/// Requested result ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Descending text relevance. Only meaningful with a non-empty query;
    /// an empty query falls back to `Newest`.
    #[default]
    Relevance,

    /// Cheapest first.
    #[serde(alias = "price_asc")]
    PriceAscending,

    /// Most expensive first.
    #[serde(alias = "price_desc")]
    PriceDescending,

    /// Most recently created first.
    Newest,
}

impl SortMode {
    /// The canonical wire name of this sort mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAscending => "price_ascending",
            Self::PriceDescending => "price_descending",
            Self::Newest => "newest",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    /// Parse a sort mode. Unknown names are rejected rather than defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "price_ascending" | "price_asc" => Ok(Self::PriceAscending),
            "price_descending" | "price_desc" => Ok(Self::PriceDescending),
            "newest" => Ok(Self::Newest),
            other => Err(format!("Unknown sort mode: '{}'", other)),
        }
    }
}

/// Product search parameters.
///
/// Transient, constructed per call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    /// Raw user-typed query text. May be empty.
    #[serde(default)]
    pub raw_query: String,

    /// Structured facet filters.
    #[serde(default)]
    pub filters: FilterSet,

    /// Requested ordering.
    #[serde(default)]
    pub sort: SortMode,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,

    /// Number of results per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl SearchRequest {
    /// Create a request for the first page with no filters and relevance ordering.
    ///
    /// # Example
    ///
    /// ```
    /// use product_search_shared::{SearchRequest, SortMode};
    ///
    /// let request = SearchRequest::new("gold ring").with_sort(SortMode::Newest);
    /// assert_eq!(request.page, 1);
    /// ```
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            filters: FilterSet::default(),
            sort: SortMode::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }

    /// Set the filters.
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Set the ordering.
    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    /// Set the page number and size.
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Offset of the first result of the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Validate the request shape.
    ///
    /// Returns an error message if the page or page size is zero, if the page
    /// size exceeds `max_page_size`, or if the filters are invalid.
    pub fn validate(&self, max_page_size: u32) -> Result<(), String> {
        if self.page == 0 {
            return Err("page must be at least 1".to_string());
        }

        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }

        if self.page_size > max_page_size {
            return Err(format!(
                "page_size {} exceeds maximum {}",
                self.page_size, max_page_size
            ));
        }

        self.filters.validate()
    }
}
