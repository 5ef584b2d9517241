//! Request and response types exchanged with the search backends.

use std::collections::BTreeMap;

use product_search_shared::{SearchHistoryRecord, SearchResultItem, SortMode};
use uuid::Uuid;

use crate::errors::SearchError;
use crate::filter::Predicate;
use crate::query::NormalizedQuery;

/// The ordering actually applied by a backend.
///
/// Every ordering is completed by `id ASC` so that pagination is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveSort {
    /// Relevance score descending.
    Relevance,
    /// Price ascending.
    PriceAscending,
    /// Price descending.
    PriceDescending,
    /// Creation timestamp descending.
    Newest,
}

impl EffectiveSort {
    /// Resolve the requested sort against the normalized query.
    ///
    /// `Relevance` without query tokens has nothing to rank by and falls back
    /// to `Newest`.
    pub fn resolve(sort: SortMode, query: &NormalizedQuery) -> Self {
        match sort {
            SortMode::Relevance if query.is_empty() => Self::Newest,
            SortMode::Relevance => Self::Relevance,
            SortMode::PriceAscending => Self::PriceAscending,
            SortMode::PriceDescending => Self::PriceDescending,
            SortMode::Newest => Self::Newest,
        }
    }
}

/// A fully prepared retrieval: normalized text, composed predicate, resolved
/// ordering and the page window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub query: NormalizedQuery,
    pub predicate: Predicate,
    pub sort: EffectiveSort,
    pub offset: u64,
    pub limit: u64,
}

/// One page of matches returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub items: Vec<SearchResultItem>,
    /// Total matches before pagination.
    pub total_count: u64,
}

/// Result of a batch operation for a single product.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The product's identifier.
    pub product_id: Uuid,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Lets callers handle partial failures of a projection sync.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-item results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// An additive count increment for one popular term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermIncrement {
    pub term: String,
    pub count: i64,
}

/// Increments produced by rolling up a window of search history.
///
/// The window is `(previous_cursor, next_cursor]` in history id space.
/// Applying a roll-up is a compare-and-set on `previous_cursor`, which makes
/// re-aggregation of the same window a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRollup {
    pub previous_cursor: i64,
    pub next_cursor: i64,
    pub increments: Vec<TermIncrement>,
}

impl TermRollup {
    /// Group history records by canonical term.
    ///
    /// `records` must be the rows with `id > previous_cursor`, in id order.
    /// Records whose text has no canonical term still advance the cursor.
    pub fn from_history(previous_cursor: i64, records: &[SearchHistoryRecord]) -> Self {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        let mut next_cursor = previous_cursor;

        for record in records {
            next_cursor = next_cursor.max(record.id);
            if let Some(term) = canonical_term(&record.query_text) {
                *counts.entry(term).or_insert(0) += 1;
            }
        }

        Self {
            previous_cursor,
            next_cursor,
            increments: counts
                .into_iter()
                .map(|(term, count)| TermIncrement { term, count })
                .collect(),
        }
    }

    /// Returns true if the roll-up neither counts anything nor moves the cursor.
    pub fn is_noop(&self) -> bool {
        self.increments.is_empty() && self.next_cursor == self.previous_cursor
    }
}

/// The popular-term key for a query text: trimmed, whitespace-collapsed and
/// lowercased. Blank text has no term.
pub fn canonical_term(query_text: &str) -> Option<String> {
    let term = query_text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if term.is_empty() {
        None
    } else {
        Some(term)
    }
}
