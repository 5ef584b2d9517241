//! Popular terms repository trait definition.

use async_trait::async_trait;
use product_search_shared::PopularSearchTerm;

use crate::errors::SearchError;
use crate::types::TermRollup;

/// Global search term counts.
///
/// Reads serve autocomplete and trending searches. The write path is a
/// periodic roll-up of search history; counts are only ever incremented.
#[async_trait]
pub trait PopularTermsRepository: Send + Sync {
    /// Terms ordered by count descending, then term ascending.
    ///
    /// With `Some(prefix)` only terms starting with it (case-insensitive) are
    /// returned.
    async fn top_terms(
        &self,
        prefix: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PopularSearchTerm>, SearchError>;

    /// The id of the last history record already rolled up (0 if none).
    async fn aggregation_cursor(&self) -> Result<i64, SearchError>;

    /// Atomically apply a roll-up's increments and advance the cursor.
    ///
    /// Each increment is an insert-or-increment keyed by term. Nothing is
    /// applied if the stored cursor no longer equals `rollup.previous_cursor`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The roll-up was applied
    /// * `Ok(false)` - The window was already applied by another run
    /// * `Err(SearchError::WriteError)` - If the transaction fails
    async fn apply_rollup(&self, rollup: &TermRollup) -> Result<bool, SearchError>;
}
