//! In-memory search history.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use product_search_shared::{NewSearchRecord, SearchHistoryRecord};
use tokio::sync::RwLock;

use crate::errors::SearchError;
use crate::interfaces::SearchHistoryRepository;

struct HistoryLog {
    records: Vec<SearchHistoryRecord>,
    next_id: i64,
}

/// Append-only history held in process memory.
///
/// Ids are assigned from 1 in insertion order.
pub struct MemorySearchHistory {
    log: RwLock<HistoryLog>,
}

impl MemorySearchHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self {
            log: RwLock::new(HistoryLog {
                records: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// All records in id order.
    pub async fn records(&self) -> Vec<SearchHistoryRecord> {
        self.log.read().await.records.clone()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.log.read().await.records.len()
    }

    /// Returns true if nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.log.read().await.records.is_empty()
    }

    /// Append a record with an explicit timestamp.
    pub async fn record_at(&self, record: &NewSearchRecord, created_at: DateTime<Utc>) -> i64 {
        let mut log = self.log.write().await;
        let id = log.next_id;
        log.next_id += 1;
        log.records.push(SearchHistoryRecord {
            id,
            requester_id: record.requester_id.clone(),
            query_text: record.query_text.clone(),
            result_count: record.result_count,
            created_at,
        });
        id
    }
}

impl Default for MemorySearchHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchHistoryRepository for MemorySearchHistory {
    async fn record(&self, record: &NewSearchRecord) -> Result<(), SearchError> {
        self.record_at(record, Utc::now()).await;
        Ok(())
    }

    async fn recent_queries(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError> {
        let log = self.log.read().await;
        let mut seen = HashSet::new();

        Ok(log
            .records
            .iter()
            .rev()
            .filter(|r| r.requester_id.as_deref() == Some(requester_id))
            .filter(|r| !r.query_text.is_empty())
            .filter(|r| seen.insert(r.query_text.as_str()))
            .take(limit)
            .map(|r| r.query_text.clone())
            .collect())
    }

    async fn history_matches(
        &self,
        requester_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError> {
        let log = self.log.read().await;
        let prefix = prefix.to_lowercase();

        Ok(log
            .records
            .iter()
            .rev()
            .filter(|r| r.requester_id.as_deref() == Some(requester_id))
            .filter(|r| r.query_text.to_lowercase().starts_with(&prefix))
            .take(limit)
            .map(|r| r.query_text.clone())
            .collect())
    }

    async fn records_after(
        &self,
        after_id: i64,
        created_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SearchHistoryRecord>, SearchError> {
        let log = self.log.read().await;

        Ok(log
            .records
            .iter()
            .filter(|r| r.id > after_id && r.created_at < created_before)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn seeded() -> MemorySearchHistory {
        let history = MemorySearchHistory::new();
        for (text, requester) in [
            ("gold ring", Some("alice")),
            ("silver", Some("alice")),
            ("Gold chain", Some("alice")),
            ("gold ring", Some("alice")),
            ("gold", Some("bob")),
            ("gold bar", None),
        ] {
            history
                .record(&NewSearchRecord::new(text, requester, 1))
                .await
                .unwrap();
        }
        history
    }

    #[tokio::test]
    async fn test_recent_queries_are_distinct_and_most_recent_first() {
        let history = seeded().await;

        let recent = history.recent_queries("alice", 10).await.unwrap();
        assert_eq!(recent, vec!["gold ring", "Gold chain", "silver"]);

        let limited = history.recent_queries("alice", 2).await.unwrap();
        assert_eq!(limited, vec!["gold ring", "Gold chain"]);
    }

    #[tokio::test]
    async fn test_history_matches_keep_occurrences() {
        let history = seeded().await;

        let matches = history.history_matches("alice", "GO", 10).await.unwrap();
        assert_eq!(matches, vec!["gold ring", "Gold chain", "gold ring"]);

        assert!(history.history_matches("carol", "go", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_after_respects_cursor_and_settle_bound() {
        let history = seeded().await;
        let now = Utc::now();

        let after = history
            .records_after(4, now + Duration::seconds(1), 10)
            .await
            .unwrap();
        assert_eq!(after.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 6]);

        let unsettled = history
            .records_after(0, now - Duration::hours(1), 10)
            .await
            .unwrap();
        assert!(unsettled.is_empty());
    }
}
