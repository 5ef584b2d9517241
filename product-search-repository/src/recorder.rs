//! Fire-and-forget search history recording.
//!
//! A completed search dispatches its history write to a background task. The
//! response path never waits for it; failures and timeouts are logged and
//! dropped, never retried inline.

use std::sync::Arc;
use std::time::Duration;

use product_search_shared::NewSearchRecord;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::interfaces::SearchHistoryRepository;

/// Dispatches history writes without blocking the caller.
#[derive(Clone)]
pub struct HistoryRecorder {
    repository: Arc<dyn SearchHistoryRepository>,
    write_timeout: Duration,
}

impl HistoryRecorder {
    /// Create a recorder whose writes are bounded by `write_timeout`.
    pub fn new(repository: Arc<dyn SearchHistoryRepository>, write_timeout: Duration) -> Self {
        Self {
            repository,
            write_timeout,
        }
    }

    /// Spawn the write and return immediately.
    ///
    /// The returned handle resolves once the write finished, failed or timed
    /// out; dropping it detaches the task. It never carries an error.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, record: NewSearchRecord) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let write_timeout = self.write_timeout;

        tokio::spawn(async move {
            match timeout(write_timeout, repository.record(&record)).await {
                Ok(Ok(())) => {
                    debug!(
                        query = %record.query_text,
                        result_count = record.result_count,
                        "Search history recorded"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        query = %record.query_text,
                        requester_id = ?record.requester_id,
                        error = %e,
                        "Failed to record search history"
                    );
                }
                Err(_) => {
                    warn!(
                        query = %record.query_text,
                        requester_id = ?record.requester_id,
                        timeout_ms = write_timeout.as_millis() as u64,
                        "Search history write timed out"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::memory::MemorySearchHistory;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use product_search_shared::SearchHistoryRecord;

    struct StalledHistory;

    #[async_trait]
    impl SearchHistoryRepository for StalledHistory {
        async fn record(&self, _record: &NewSearchRecord) -> Result<(), SearchError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        async fn recent_queries(&self, _: &str, _: usize) -> Result<Vec<String>, SearchError> {
            Ok(Vec::new())
        }

        async fn history_matches(
            &self,
            _: &str,
            _: &str,
            _: usize,
        ) -> Result<Vec<String>, SearchError> {
            Ok(Vec::new())
        }

        async fn records_after(
            &self,
            _: i64,
            _: DateTime<Utc>,
            _: usize,
        ) -> Result<Vec<SearchHistoryRecord>, SearchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_dispatch_appends_record() {
        let history = Arc::new(MemorySearchHistory::new());
        let recorder = HistoryRecorder::new(history.clone(), Duration::from_secs(1));

        recorder
            .dispatch(NewSearchRecord::new("gold ring", Some("user-1"), 4))
            .await
            .unwrap();

        let records = history.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query_text, "gold ring");
        assert_eq!(records[0].result_count, 4);
    }

    #[tokio::test]
    async fn test_stalled_write_is_abandoned_after_timeout() {
        let recorder = HistoryRecorder::new(Arc::new(StalledHistory), Duration::from_millis(20));

        let handle = recorder.dispatch(NewSearchRecord::new("ring", None, 0));

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("write should give up at its own deadline")
            .unwrap();
    }
}
