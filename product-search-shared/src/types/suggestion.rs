//! Popular term and autocomplete suggestion types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A search term with a maintained global occurrence count.
///
/// `term` is unique. Counts only grow through additive roll-ups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopularSearchTerm {
    pub term: String,
    pub count: i64,
    pub last_updated_at: DateTime<Utc>,
}

impl PopularSearchTerm {
    pub fn new(term: impl Into<String>, count: i64) -> Self {
        Self {
            term: term.into(),
            count,
            last_updated_at: Utc::now(),
        }
    }
}

/// A ranked autocomplete suggestion. Computed per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutocompleteSuggestion {
    pub term: String,
    /// Merged weight: popular count plus one per matching history occurrence.
    pub count: i64,
}

impl AutocompleteSuggestion {
    pub fn new(term: impl Into<String>, count: i64) -> Self {
        Self {
            term: term.into(),
            count,
        }
    }
}
