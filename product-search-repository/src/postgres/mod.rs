//! PostgreSQL backends.
//!
//! Full-text product retrieval uses a generated `tsvector` column with the
//! `simple` configuration, so tokens are matched as written with no stemming
//! or stop-word removal. All tables are created by the embedded migrations.
//!
//! ## Database Tables
//!
//! - `product_search_documents`: Searchable product projections
//! - `search_history`: Append-only log of completed searches
//! - `popular_search_terms`: Rolled-up term counts
//! - `search_aggregation_cursor`: Last history id folded into the counts

mod popular_terms;
mod product_index;
mod search_history;

pub use popular_terms::PostgresPopularTerms;
pub use product_index::PostgresProductIndex;
pub use search_history::PostgresSearchHistory;

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::errors::SearchError;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("src/postgres/migrations");

/// Open a connection pool.
///
/// # Arguments
///
/// * `url` - PostgreSQL connection string
/// * `max_connections` - Pool size upper bound
///
/// # Returns
///
/// * `Ok(PgPool)` - A connected pool
/// * `Err(SearchError::ConnectionError)` - If the database is unreachable
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, SearchError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| SearchError::connection(e.to_string()))?;

    info!(max_connections = max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Escape `LIKE` wildcards so that `prefix` matches literally, then append `%`.
pub(crate) fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_pattern_escapes_wildcards() {
        assert_eq!(like_prefix_pattern("gold"), "gold%");
        assert_eq!(like_prefix_pattern("50%_off"), "50\\%\\_off%");
        assert_eq!(like_prefix_pattern("a\\b"), "a\\\\b%");
    }
}
