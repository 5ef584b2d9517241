//! PostgreSQL search history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use product_search_shared::{NewSearchRecord, SearchHistoryRecord};
use sqlx::{PgPool, Row};

use crate::errors::SearchError;
use crate::interfaces::SearchHistoryRepository;
use crate::postgres::like_prefix_pattern;

/// Append-only `search_history` table.
pub struct PostgresSearchHistory {
    pool: PgPool,
}

impl PostgresSearchHistory {
    /// Create a repository over an existing pool with the schema applied.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl SearchHistoryRepository for PostgresSearchHistory {
    async fn record(&self, record: &NewSearchRecord) -> Result<(), SearchError> {
        sqlx::query(
            "INSERT INTO search_history (requester_id, query_text, result_count) VALUES ($1, $2, $3)",
        )
        .bind(&record.requester_id)
        .bind(&record.query_text)
        .bind(record.result_count)
        .execute(&self.pool)
        .await
        .map_err(|e| SearchError::write(e.to_string()))?;

        Ok(())
    }

    async fn recent_queries(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError> {
        let queries = sqlx::query_scalar(
            r#"
            SELECT query_text
            FROM search_history
            WHERE requester_id = $1 AND query_text <> ''
            GROUP BY query_text
            ORDER BY MAX(id) DESC
            LIMIT $2
            "#,
        )
        .bind(requester_id)
        .bind(to_sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(queries)
    }

    async fn history_matches(
        &self,
        requester_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError> {
        let matches = sqlx::query_scalar(
            r#"
            SELECT query_text
            FROM search_history
            WHERE requester_id = $1 AND query_text ILIKE $2 ESCAPE '\'
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(requester_id)
        .bind(like_prefix_pattern(prefix))
        .bind(to_sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    async fn records_after(
        &self,
        after_id: i64,
        created_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SearchHistoryRecord>, SearchError> {
        let rows = sqlx::query(
            r#"
            SELECT id, requester_id, query_text, result_count, created_at
            FROM search_history
            WHERE id > $1 AND created_at < $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(after_id)
        .bind(created_before)
        .bind(to_sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SearchHistoryRecord {
                    id: row.try_get("id")?,
                    requester_id: row.try_get("requester_id")?,
                    query_text: row.try_get("query_text")?,
                    result_count: row.try_get("result_count")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(SearchError::from)
    }
}
