//! PostgreSQL popular terms and aggregation cursor.

use async_trait::async_trait;
use product_search_shared::PopularSearchTerm;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::debug;

use crate::errors::SearchError;
use crate::interfaces::PopularTermsRepository;
use crate::postgres::like_prefix_pattern;
use crate::types::{TermIncrement, TermRollup};

/// Cursor row id for the popular-term roll-up.
pub const AGGREGATION_CURSOR_ID: &str = "popular_search_terms";

/// `popular_search_terms` with its roll-up cursor.
pub struct PostgresPopularTerms {
    pool: PgPool,
}

impl PostgresPopularTerms {
    /// Create a repository over an existing pool with the schema applied.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert-or-increment every term in a single statement.
    async fn upsert_increments_tx(
        increments: &[TermIncrement],
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        if increments.is_empty() {
            return Ok(());
        }

        let mut query_builder =
            QueryBuilder::new("INSERT INTO popular_search_terms (term, count, last_updated_at) ");

        query_builder.push_values(increments, |mut b, increment| {
            b.push_bind(increment.term.clone())
                .push_bind(increment.count)
                .push("NOW()");
        });

        query_builder.push(
            " ON CONFLICT (term) DO UPDATE SET \
             count = popular_search_terms.count + EXCLUDED.count, \
             last_updated_at = EXCLUDED.last_updated_at",
        );

        query_builder.build().execute(&mut **tx).await?;
        Ok(())
    }
}

#[async_trait]
impl PopularTermsRepository for PostgresPopularTerms {
    async fn top_terms(
        &self,
        prefix: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PopularSearchTerm>, SearchError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = match prefix {
            Some(prefix) => {
                sqlx::query(
                    r#"
                    SELECT term, count, last_updated_at
                    FROM popular_search_terms
                    WHERE lower(term) LIKE $1 ESCAPE '\'
                    ORDER BY count DESC, term ASC
                    LIMIT $2
                    "#,
                )
                .bind(like_prefix_pattern(&prefix.to_lowercase()))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT term, count, last_updated_at
                    FROM popular_search_terms
                    ORDER BY count DESC, term ASC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| {
                Ok(PopularSearchTerm {
                    term: row.try_get("term")?,
                    count: row.try_get("count")?,
                    last_updated_at: row.try_get("last_updated_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(SearchError::from)
    }

    async fn aggregation_cursor(&self) -> Result<i64, SearchError> {
        let cursor: Option<i64> = sqlx::query_scalar(
            "SELECT last_history_id FROM search_aggregation_cursor WHERE id = $1",
        )
        .bind(AGGREGATION_CURSOR_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cursor.unwrap_or(0))
    }

    async fn apply_rollup(&self, rollup: &TermRollup) -> Result<bool, SearchError> {
        let write_err = |e: sqlx::Error| SearchError::write(e.to_string());

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query(
            "INSERT INTO search_aggregation_cursor (id, last_history_id) VALUES ($1, 0) ON CONFLICT (id) DO NOTHING",
        )
        .bind(AGGREGATION_CURSOR_ID)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        let advanced = sqlx::query(
            r#"
            UPDATE search_aggregation_cursor
            SET last_history_id = $1, updated_at = NOW()
            WHERE id = $2 AND last_history_id = $3
            "#,
        )
        .bind(rollup.next_cursor)
        .bind(AGGREGATION_CURSOR_ID)
        .bind(rollup.previous_cursor)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        if advanced.rows_affected() == 0 {
            tx.rollback().await.map_err(write_err)?;
            debug!(
                previous_cursor = rollup.previous_cursor,
                "Roll-up window already applied"
            );
            return Ok(false);
        }

        Self::upsert_increments_tx(&rollup.increments, &mut tx)
            .await
            .map_err(write_err)?;

        tx.commit().await.map_err(write_err)?;
        Ok(true)
    }
}
