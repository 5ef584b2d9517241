//! In-memory popular terms.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use product_search_shared::PopularSearchTerm;
use tokio::sync::RwLock;

use crate::errors::SearchError;
use crate::interfaces::PopularTermsRepository;
use crate::types::TermRollup;

#[derive(Default)]
struct TermTable {
    terms: BTreeMap<String, PopularSearchTerm>,
    cursor: i64,
}

/// Popular term counts held in process memory.
#[derive(Default)]
pub struct MemoryPopularTerms {
    table: RwLock<TermTable>,
}

impl MemoryPopularTerms {
    /// Create an empty table with the cursor at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table pre-populated with `terms`.
    pub fn with_terms(terms: impl IntoIterator<Item = PopularSearchTerm>) -> Self {
        Self {
            table: RwLock::new(TermTable {
                terms: terms.into_iter().map(|t| (t.term.clone(), t)).collect(),
                cursor: 0,
            }),
        }
    }

    /// The stored count of a term, if any.
    pub async fn count_of(&self, term: &str) -> Option<i64> {
        self.table.read().await.terms.get(term).map(|t| t.count)
    }
}

#[async_trait]
impl PopularTermsRepository for MemoryPopularTerms {
    async fn top_terms(
        &self,
        prefix: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PopularSearchTerm>, SearchError> {
        let table = self.table.read().await;
        let prefix = prefix.map(str::to_lowercase);

        let mut terms: Vec<PopularSearchTerm> = table
            .terms
            .values()
            .filter(|t| match &prefix {
                Some(prefix) => t.term.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
        terms.truncate(limit);
        Ok(terms)
    }

    async fn aggregation_cursor(&self) -> Result<i64, SearchError> {
        Ok(self.table.read().await.cursor)
    }

    async fn apply_rollup(&self, rollup: &TermRollup) -> Result<bool, SearchError> {
        let mut table = self.table.write().await;

        if table.cursor != rollup.previous_cursor {
            return Ok(false);
        }

        let now = Utc::now();
        for increment in &rollup.increments {
            let entry = table
                .terms
                .entry(increment.term.clone())
                .or_insert_with(|| PopularSearchTerm::new(increment.term.clone(), 0));
            entry.count += increment.count;
            entry.last_updated_at = now;
        }
        table.cursor = rollup.next_cursor;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TermIncrement;

    fn rollup(previous: i64, next: i64, increments: &[(&str, i64)]) -> TermRollup {
        TermRollup {
            previous_cursor: previous,
            next_cursor: next,
            increments: increments
                .iter()
                .map(|(term, count)| TermIncrement {
                    term: term.to_string(),
                    count: *count,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_top_terms_ordering_and_prefix() {
        let terms = MemoryPopularTerms::with_terms([
            PopularSearchTerm::new("gold ring", 10),
            PopularSearchTerm::new("gold bar", 10),
            PopularSearchTerm::new("silver", 50),
        ]);

        let all = terms.top_terms(None, 10).await.unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(names, vec!["silver", "gold bar", "gold ring"]);

        let gold = terms.top_terms(Some("GOLD"), 1).await.unwrap();
        assert_eq!(gold.len(), 1);
        assert_eq!(gold[0].term, "gold bar");
    }

    #[tokio::test]
    async fn test_apply_rollup_inserts_and_increments() {
        let terms = MemoryPopularTerms::new();

        assert!(terms.apply_rollup(&rollup(0, 3, &[("gold", 2), ("ring", 1)])).await.unwrap());
        assert!(terms.apply_rollup(&rollup(3, 5, &[("gold", 2)])).await.unwrap());

        assert_eq!(terms.count_of("gold").await, Some(4));
        assert_eq!(terms.count_of("ring").await, Some(1));
        assert_eq!(terms.aggregation_cursor().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_stale_rollup_is_rejected() {
        let terms = MemoryPopularTerms::new();
        let window = rollup(0, 3, &[("gold", 2)]);

        assert!(terms.apply_rollup(&window).await.unwrap());
        assert!(!terms.apply_rollup(&window).await.unwrap());

        assert_eq!(terms.count_of("gold").await, Some(2));
        assert_eq!(terms.aggregation_cursor().await.unwrap(), 3);
    }
}
