//! Configuration and dependency initialization.
//!
//! Settings are read from environment variables (optionally loaded from a
//! `.env` file) with documented defaults.

mod dependencies;

pub use dependencies::Dependencies;

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::aggregator::AggregatorConfig;
use crate::errors::ServiceError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default OpenSearch index alias.
const DEFAULT_INDEX_ALIAS: &str = "products";

/// Default Postgres pool size.
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default HTTP port.
const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default history write deadline in milliseconds.
const DEFAULT_HISTORY_WRITE_TIMEOUT_MS: u64 = 2000;

/// Default aggregation period in seconds.
const DEFAULT_AGGREGATION_INTERVAL_SECS: u64 = 60;

/// Default history rows per aggregation batch.
const DEFAULT_AGGREGATION_BATCH_SIZE: usize = 1000;

/// Default aggregation settle window in seconds.
const DEFAULT_AGGREGATION_SETTLE_SECS: u64 = 5;

/// Default storefront origin.
const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Backend serving product retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    /// Postgres full-text search over the projection table.
    Postgres,
    /// OpenSearch index; history and popular terms stay in Postgres.
    OpenSearch,
    /// Everything in process memory. For local development only.
    Memory,
}

impl FromStr for SearchBackend {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "opensearch" => Ok(Self::OpenSearch),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(ServiceError::config(format!(
                "Unknown SEARCH_BACKEND '{}', expected postgres, opensearch or memory",
                other
            ))),
        }
    }
}

/// Connection mode for datastores at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection on an interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if invalid.
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!(value = %value, "Invalid CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Service settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: SearchBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub opensearch_url: String,
    pub index_alias: String,
    pub index_version: u32,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub server_port: u16,
    pub history_write_timeout: Duration,
    /// `None` disables the aggregation job.
    pub aggregator: Option<AggregatorConfig>,
    pub cors_allowed_origins: Vec<String>,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_BACKEND`: "postgres", "opensearch" or "memory" (default: postgres)
    /// - `DATABASE_URL`: Postgres URL, required unless the backend is memory
    /// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_ALIAS`: Index alias name (default: "products")
    /// - `PRODUCTS_INDEX_VERSION`: Index version number (default: 0)
    /// - `CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `CONNECTION_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `SERVER_PORT`: HTTP port (default: 8080)
    /// - `HISTORY_WRITE_TIMEOUT_MS`: History insert deadline (default: 2000)
    /// - `AGGREGATION_INTERVAL_SECS`: Roll-up period, 0 disables (default: 60)
    /// - `AGGREGATION_BATCH_SIZE`: History rows per roll-up batch (default: 1000)
    /// - `AGGREGATION_SETTLE_SECS`: Minimum history row age (default: 5)
    /// - `CORS_ALLOWED_ORIGINS`: Comma-separated origins (default: http://localhost:3000)
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("SEARCH_BACKEND") {
            Some(value) => value.parse()?,
            None => SearchBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if database_url.is_none() && backend != SearchBackend::Memory {
            return Err(ServiceError::config(format!(
                "DATABASE_URL must be set for the {:?} backend",
                backend
            )));
        }

        let connection_mode = lookup("CONNECTION_MODE")
            .map(|v| ConnectionMode::parse(&v))
            .unwrap_or(ConnectionMode::Retry);

        let aggregation_interval = parse_or(
            &lookup,
            "AGGREGATION_INTERVAL_SECS",
            DEFAULT_AGGREGATION_INTERVAL_SECS,
        );
        let settle = Duration::from_secs(parse_or(
            &lookup,
            "AGGREGATION_SETTLE_SECS",
            DEFAULT_AGGREGATION_SETTLE_SECS,
        ));
        let settle_fits = chrono::Duration::from_std(settle)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .is_some();
        if !settle_fits {
            return Err(ServiceError::config(format!(
                "AGGREGATION_SETTLE_SECS is out of range: {}",
                settle.as_secs()
            )));
        }

        let aggregator = (aggregation_interval > 0).then(|| AggregatorConfig {
            interval: Duration::from_secs(aggregation_interval),
            batch_size: parse_or(&lookup, "AGGREGATION_BATCH_SIZE", DEFAULT_AGGREGATION_BATCH_SIZE),
            settle,
        });

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            backend,
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            ),
            opensearch_url: lookup("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            index_alias: lookup("INDEX_ALIAS").unwrap_or_else(|| DEFAULT_INDEX_ALIAS.to_string()),
            index_version: parse_or(&lookup, "PRODUCTS_INDEX_VERSION", 0),
            connection_mode,
            retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "CONNECTION_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            server_port: parse_or(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT),
            history_write_timeout: Duration::from_millis(parse_or(
                &lookup,
                "HISTORY_WRITE_TIMEOUT_MS",
                DEFAULT_HISTORY_WRITE_TIMEOUT_MS,
            )),
            aggregator,
            cors_allowed_origins,
        })
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ServiceError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/search")]).unwrap();

        assert_eq!(s.backend, SearchBackend::Postgres);
        assert_eq!(s.database_max_connections, 10);
        assert_eq!(s.index_alias, "products");
        assert_eq!(s.connection_mode, ConnectionMode::Retry);
        assert_eq!(s.server_port, 8080);
        assert_eq!(s.history_write_timeout, Duration::from_millis(2000));
        assert_eq!(s.cors_allowed_origins, vec!["http://localhost:3000"]);

        let aggregator = s.aggregator.unwrap();
        assert_eq!(aggregator.interval, Duration::from_secs(60));
        assert_eq!(aggregator.batch_size, 1000);
        assert_eq!(aggregator.settle, Duration::from_secs(5));
    }

    #[test]
    fn test_database_url_required_unless_memory() {
        assert!(matches!(settings(&[]), Err(ServiceError::ConfigError(_))));
        assert!(settings(&[("SEARCH_BACKEND", "opensearch")]).is_err());

        let memory = settings(&[("SEARCH_BACKEND", "Memory")]).unwrap();
        assert_eq!(memory.backend, SearchBackend::Memory);
        assert!(memory.database_url.is_none());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(settings(&[("SEARCH_BACKEND", "solr")]).is_err());
    }

    #[test]
    fn test_out_of_range_settle_window_is_config_error() {
        let result = settings(&[
            ("SEARCH_BACKEND", "memory"),
            ("AGGREGATION_SETTLE_SECS", "18446744073709551615"),
        ]);
        assert!(matches!(result, Err(ServiceError::ConfigError(_))));

        let s = settings(&[
            ("SEARCH_BACKEND", "memory"),
            ("AGGREGATION_SETTLE_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(s.aggregator.unwrap().settle, Duration::ZERO);
    }

    #[test]
    fn test_overrides_and_malformed_values() {
        let s = settings(&[
            ("SEARCH_BACKEND", "memory"),
            ("SERVER_PORT", "9090"),
            ("CONNECTION_MODE", "FAIL-FAST"),
            ("HISTORY_WRITE_TIMEOUT_MS", "not-a-number"),
            ("AGGREGATION_INTERVAL_SECS", "0"),
            ("CORS_ALLOWED_ORIGINS", "https://shop.example, ,http://localhost:5173"),
        ])
        .unwrap();

        assert_eq!(s.server_port, 9090);
        assert_eq!(s.connection_mode, ConnectionMode::FailFast);
        assert_eq!(s.history_write_timeout, Duration::from_millis(2000));
        assert!(s.aggregator.is_none());
        assert_eq!(
            s.cors_allowed_origins,
            vec!["https://shop.example", "http://localhost:5173"]
        );
    }
}
