//! Search result types for the product search engine.
//!
//! This module defines the response structures returned from product searches.

use serde::{Deserialize, Serialize};

use crate::types::product_document::ProductDocument;

/// A single search result item.
///
/// Contains the product projection along with its relevance score. Scores are
/// only meaningful for relevance-ordered text searches; filter-only retrievals
/// report `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResultItem {
    /// The matched product.
    pub product: ProductDocument,

    /// Relevance score from the full-text index.
    /// Higher scores indicate better matches.
    pub relevance_score: f64,
}

/// One page of search results plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResultSet {
    /// The results of the requested page, in the requested order.
    pub items: Vec<SearchResultItem>,

    /// Total number of matching products before pagination.
    pub total_count: u64,

    /// The 1-based page these items belong to.
    pub page: u32,

    /// The requested page size.
    pub page_size: u32,

    /// Time taken to execute the search in milliseconds.
    pub took_ms: u64,
}

impl SearchResultSet {
    /// Create an empty result set for the given page.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page,
            page_size,
            took_ms: 0,
        }
    }

    /// Returns true if there are no items on this page.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total number of pages for the current page size.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }
}
