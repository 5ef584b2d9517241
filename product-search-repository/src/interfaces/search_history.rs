//! Search history repository trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use product_search_shared::{NewSearchRecord, SearchHistoryRecord};

use crate::errors::SearchError;

/// Append-only store of completed searches.
///
/// Records are never updated or deleted through this interface.
#[async_trait]
pub trait SearchHistoryRepository: Send + Sync {
    /// Append one record.
    async fn record(&self, record: &NewSearchRecord) -> Result<(), SearchError>;

    /// Distinct query texts of a requester, most recent first.
    async fn recent_queries(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError>;

    /// A requester's history occurrences whose text starts with `prefix`
    /// (case-insensitive), most recent first. Repeated searches appear once per
    /// occurrence.
    async fn history_matches(
        &self,
        requester_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError>;

    /// Records with `id > after_id` created before `created_before`, in id order.
    async fn records_after(
        &self,
        after_id: i64,
        created_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SearchHistoryRecord>, SearchError>;
}
