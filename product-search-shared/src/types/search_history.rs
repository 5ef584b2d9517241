//! Search history types.
//!
//! History records are an append-only audit of completed searches. They are
//! never updated or deleted by the search engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted search history row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHistoryRecord {
    /// Monotonically increasing row id assigned by the store.
    pub id: i64,
    /// Requester identity, `None` for anonymous searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    /// The query text as the requester typed it (trimmed).
    pub query_text: String,
    /// Total number of matches the search produced.
    pub result_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A history record about to be appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSearchRecord {
    pub requester_id: Option<String>,
    pub query_text: String,
    pub result_count: i64,
}

impl NewSearchRecord {
    /// Create a new record. Blank requester ids are stored as anonymous.
    pub fn new(query_text: &str, requester_id: Option<&str>, result_count: u64) -> Self {
        Self {
            requester_id: requester_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            query_text: query_text.trim().to_string(),
            result_count: i64::try_from(result_count).unwrap_or(i64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_search_record_trims() {
        let record = NewSearchRecord::new("  gold ring ", Some(" user-1 "), 3);
        assert_eq!(record.query_text, "gold ring");
        assert_eq!(record.requester_id.as_deref(), Some("user-1"));
        assert_eq!(record.result_count, 3);
    }

    #[test]
    fn test_blank_requester_is_anonymous() {
        let record = NewSearchRecord::new("ring", Some("   "), 0);
        assert!(record.requester_id.is_none());

        let record = NewSearchRecord::new("ring", None, 0);
        assert!(record.requester_id.is_none());
    }
}
