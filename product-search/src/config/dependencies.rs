//! Dependency initialization and wiring for the product search service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use product_search_repository::memory::{
    MemoryPopularTerms, MemoryProductIndex, MemorySearchHistory,
};
use product_search_repository::opensearch::IndexConfig;
use product_search_repository::{
    postgres, OpenSearchProvider, PopularTermsRepository, PostgresPopularTerms,
    PostgresProductIndex, PostgresSearchHistory, ProductIndexProvider, ProductSearchService,
    SearchError, SearchHistoryRepository, SearchServiceConfig,
};
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::aggregator::PopularTermAggregator;
use crate::config::{ConnectionMode, SearchBackend, Settings};
use crate::errors::ServiceError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The search service shared by every request.
    pub service: Arc<ProductSearchService>,
    /// The roll-up job, if enabled.
    pub aggregator: Option<PopularTermAggregator>,
    /// The settings everything was built from.
    pub settings: Settings,
}

struct Backends {
    index: Arc<dyn ProductIndexProvider>,
    history: Arc<dyn SearchHistoryRepository>,
    popular: Arc<dyn PopularTermsRepository>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(ServiceError)` - If configuration is invalid or a datastore is
    ///   unreachable in fail-fast mode
    pub async fn new() -> Result<Self, ServiceError> {
        Self::from_settings(Settings::from_env()?).await
    }

    /// Initialize all dependencies from explicit settings.
    pub async fn from_settings(settings: Settings) -> Result<Self, ServiceError> {
        info!(
            backend = ?settings.backend,
            opensearch_url = %settings.opensearch_url,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let backends = match settings.backend {
            SearchBackend::Memory => {
                warn!("Using in-memory backends; nothing is persisted");
                Backends {
                    index: Arc::new(MemoryProductIndex::new()),
                    history: Arc::new(MemorySearchHistory::new()),
                    popular: Arc::new(MemoryPopularTerms::new()),
                }
            }
            SearchBackend::Postgres => {
                let pool = Self::connect_to_postgres(&settings).await?;
                Backends {
                    index: Arc::new(PostgresProductIndex::new(pool.clone())),
                    history: Arc::new(PostgresSearchHistory::new(pool.clone())),
                    popular: Arc::new(PostgresPopularTerms::new(pool)),
                }
            }
            SearchBackend::OpenSearch => {
                let pool = Self::connect_to_postgres(&settings).await?;
                postgres::MIGRATOR
                    .run(&pool)
                    .await
                    .map_err(|e| ServiceError::config(format!("Failed to migrate database: {}", e)))?;

                let index = Self::connect_to_opensearch(&settings).await?;
                Backends {
                    index: Arc::new(index),
                    history: Arc::new(PostgresSearchHistory::new(pool.clone())),
                    popular: Arc::new(PostgresPopularTerms::new(pool)),
                }
            }
        };

        // Exits if the index or schema cannot be created
        backends
            .index
            .ensure_index_exists()
            .await
            .map_err(|e| ServiceError::config(format!("Failed to ensure index exists: {}", e)))?;

        let service_config =
            SearchServiceConfig::default().with_history_write_timeout(settings.history_write_timeout);

        let service = Arc::new(ProductSearchService::with_config(
            backends.index,
            Arc::clone(&backends.history),
            Arc::clone(&backends.popular),
            service_config,
        ));

        let aggregator = settings.aggregator.clone().map(|config| {
            PopularTermAggregator::with_config(backends.history, backends.popular, config)
        });

        Ok(Self {
            service,
            aggregator,
            settings,
        })
    }

    async fn connect_to_postgres(settings: &Settings) -> Result<PgPool, ServiceError> {
        let url = settings
            .database_url
            .clone()
            .ok_or_else(|| ServiceError::config("DATABASE_URL must be set"))?;
        let max_connections = settings.database_max_connections;

        let pool = Self::with_retry(
            "PostgreSQL",
            settings.connection_mode,
            settings.retry_interval,
            || postgres::connect(&url, max_connections),
        )
        .await?;

        info!("PostgreSQL connection established");
        Ok(pool)
    }

    async fn connect_to_opensearch(settings: &Settings) -> Result<OpenSearchProvider, ServiceError> {
        let index_config = IndexConfig::new(settings.index_alias.clone(), settings.index_version);

        let provider = Self::with_retry(
            "OpenSearch",
            settings.connection_mode,
            settings.retry_interval,
            || OpenSearchProvider::new(&settings.opensearch_url, index_config.clone()),
        )
        .await?;

        info!("OpenSearch connection established");
        Ok(provider)
    }

    /// Run `connect` until it succeeds, honoring the connection mode.
    async fn with_retry<T, F, Fut>(
        name: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
        mut connect: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        loop {
            match connect().await {
                Ok(value) => return Ok(value),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(ServiceError::config(format!(
                            "Failed to connect to {}: {}",
                            name, e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            datastore = name,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
