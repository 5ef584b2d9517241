//! Product search service implementation.
//!
//! This module provides the main service of the search engine. Application
//! code uses it to search products, fetch autocomplete suggestions and read
//! trending and recent searches.

use std::sync::Arc;
use std::time::Instant;

use product_search_shared::{
    AutocompleteSuggestion, NewSearchRecord, ProductDocument, SearchRequest, SearchResultSet,
};
use tracing::{debug, instrument};

use crate::autocomplete::{is_searchable_prefix, merge_suggestions};
use crate::config::SearchServiceConfig;
use crate::errors::SearchError;
use crate::filter;
use crate::interfaces::{PopularTermsRepository, ProductIndexProvider, SearchHistoryRepository};
use crate::query::NormalizedQuery;
use crate::recorder::HistoryRecorder;
use crate::types::{BatchOperationSummary, EffectiveSort, ProductQuery};

/// The main service of the product search engine.
///
/// This is the high-level API that application code should use. It validates
/// requests, normalizes queries, composes filter predicates, and delegates to
/// the injected backends. The service holds no mutable state; construct it
/// once per process and share it behind an `Arc`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use product_search_repository::memory::{
///     MemoryPopularTerms, MemoryProductIndex, MemorySearchHistory,
/// };
/// use product_search_repository::ProductSearchService;
/// use product_search_shared::SearchRequest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = ProductSearchService::new(
///     Arc::new(MemoryProductIndex::new()),
///     Arc::new(MemorySearchHistory::new()),
///     Arc::new(MemoryPopularTerms::new()),
/// );
///
/// let results = service
///     .search_products(&SearchRequest::new("gold ring"), Some("user-42"))
///     .await?;
/// println!("{} matches", results.total_count);
/// # Ok(())
/// # }
/// ```
pub struct ProductSearchService {
    index: Arc<dyn ProductIndexProvider>,
    history: Arc<dyn SearchHistoryRepository>,
    popular: Arc<dyn PopularTermsRepository>,
    recorder: HistoryRecorder,
    config: SearchServiceConfig,
}

impl ProductSearchService {
    /// Create a new ProductSearchService with default configuration.
    ///
    /// # Arguments
    ///
    /// * `index` - Full-text product index (e.g., `PostgresProductIndex`)
    /// * `history` - Search history store
    /// * `popular` - Popular terms store
    pub fn new(
        index: Arc<dyn ProductIndexProvider>,
        history: Arc<dyn SearchHistoryRepository>,
        popular: Arc<dyn PopularTermsRepository>,
    ) -> Self {
        Self::with_config(index, history, popular, SearchServiceConfig::default())
    }

    /// Create a new ProductSearchService with custom configuration.
    pub fn with_config(
        index: Arc<dyn ProductIndexProvider>,
        history: Arc<dyn SearchHistoryRepository>,
        popular: Arc<dyn PopularTermsRepository>,
        config: SearchServiceConfig,
    ) -> Self {
        let recorder = HistoryRecorder::new(Arc::clone(&history), config.history_write_timeout);
        Self {
            index,
            history,
            popular,
            recorder,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchServiceConfig {
        &self.config
    }

    /// Prepare the product index for use. Call once at startup.
    pub async fn ensure_ready(&self) -> Result<(), SearchError> {
        self.index.ensure_index_exists().await
    }

    /// Validate a request and turn it into a backend retrieval.
    ///
    /// Normalizes the query, composes the filter predicate, resolves the
    /// effective ordering and computes the page window. Nothing is retrieved.
    ///
    /// # Errors
    ///
    /// `SearchError::ValidationError` for a zero page or page size, an
    /// oversized page, or invalid price bounds.
    pub fn prepare(&self, request: &SearchRequest) -> Result<ProductQuery, SearchError> {
        request
            .validate(self.config.max_page_size)
            .map_err(SearchError::validation)?;

        let query = NormalizedQuery::parse(&request.raw_query);
        let predicate = filter::compose(&request.filters)?;
        let sort = EffectiveSort::resolve(request.sort, &query);

        Ok(ProductQuery {
            query,
            predicate,
            sort,
            offset: request.offset(),
            limit: u64::from(request.page_size),
        })
    }

    /// Search products.
    ///
    /// Runs the ranked, filtered, paginated retrieval and then dispatches a
    /// history record without waiting for it. History failures never affect
    /// the returned result.
    ///
    /// # Arguments
    ///
    /// * `request` - Query text, filters, ordering and page
    /// * `requester_id` - Requester identity, `None` for anonymous
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResultSet)` - The requested page; empty means zero matches
    /// * `Err(SearchError::ValidationError)` - If the request is malformed
    /// * `Err(SearchError::RetrievalError)` - If the index fails to answer
    #[instrument(skip(self, request), fields(query = %request.raw_query, page = request.page))]
    pub async fn search_products(
        &self,
        request: &SearchRequest,
        requester_id: Option<&str>,
    ) -> Result<SearchResultSet, SearchError> {
        let started = Instant::now();
        let product_query = self.prepare(request)?;

        let page = self.index.search(&product_query).await?;

        let took_ms = started.elapsed().as_millis() as u64;
        debug!(
            total_count = page.total_count,
            returned = page.items.len(),
            sort = ?product_query.sort,
            took_ms = took_ms,
            "Search completed"
        );

        self.recorder.dispatch(NewSearchRecord::new(
            &request.raw_query,
            requester_id,
            page.total_count,
        ));

        Ok(SearchResultSet {
            items: page.items,
            total_count: page.total_count,
            page: request.page,
            page_size: request.page_size,
            took_ms,
        })
    }

    /// Suggest search terms for a prefix.
    ///
    /// Popular terms come first; if they do not fill `limit`, the requester's
    /// own matching history fills the remainder. Both sets are merged by term
    /// with summed counts, ordered by count descending then term ascending.
    ///
    /// Prefixes shorter than two characters return an empty list without
    /// touching any backend. Anonymous requesters get popular terms only.
    ///
    /// # Errors
    ///
    /// `SearchError::ValidationError` for `limit == Some(0)`; backend failures
    /// propagate as `SearchError::RetrievalError`.
    #[instrument(skip(self))]
    pub async fn get_autocomplete_suggestions(
        &self,
        prefix: &str,
        limit: Option<usize>,
        requester_id: Option<&str>,
    ) -> Result<Vec<AutocompleteSuggestion>, SearchError> {
        if !is_searchable_prefix(prefix) {
            return Ok(Vec::new());
        }

        let limit = Self::resolve_limit(
            limit,
            self.config.default_suggestion_limit,
            self.config.max_suggestion_limit,
        )?;
        let prefix = prefix.trim();

        let popular = self.popular.top_terms(Some(prefix), limit).await?;

        let history = match non_blank(requester_id) {
            Some(requester_id) if popular.len() < limit => {
                self.history
                    .history_matches(requester_id, prefix, limit - popular.len())
                    .await?
            }
            _ => Vec::new(),
        };

        Ok(merge_suggestions(&popular, &history, limit))
    }

    /// Trending search terms, most popular first.
    pub async fn get_popular_search_terms(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<String>, SearchError> {
        let limit = Self::resolve_limit(
            limit,
            self.config.default_popular_limit,
            self.config.max_list_limit,
        )?;

        let terms = self.popular.top_terms(None, limit).await?;
        Ok(terms.into_iter().map(|t| t.term).collect())
    }

    /// A requester's distinct recent searches, most recent first.
    ///
    /// A blank requester id yields an empty list.
    pub async fn get_recent_searches(
        &self,
        requester_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, SearchError> {
        let limit = Self::resolve_limit(
            limit,
            self.config.default_recent_limit,
            self.config.max_list_limit,
        )?;

        match non_blank(Some(requester_id)) {
            Some(requester_id) => self.history.recent_queries(requester_id, limit).await,
            None => Ok(Vec::new()),
        }
    }

    /// Upsert searchable product projections.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-product results
    /// * `Err(SearchError::BatchSizeExceeded)` - If the batch exceeds `max_batch_size`
    /// * `Err(SearchError::ValidationError)` - If any product has a blank name or an invalid price
    pub async fn index_products(
        &self,
        products: Vec<ProductDocument>,
    ) -> Result<BatchOperationSummary, SearchError> {
        if products.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        if let Some(max) = self.config.max_batch_size {
            if products.len() > max {
                return Err(SearchError::batch_size_exceeded(products.len(), max));
            }
        }

        for product in &products {
            Self::validate_product(product)?;
        }

        self.index.index_products(&products).await
    }

    fn validate_product(product: &ProductDocument) -> Result<(), SearchError> {
        if product.name.trim().is_empty() {
            return Err(SearchError::validation(format!(
                "product {} has an empty name",
                product.id
            )));
        }
        if !product.price.is_finite() || product.price < 0.0 {
            return Err(SearchError::validation(format!(
                "product {} has an invalid price: {}",
                product.id, product.price
            )));
        }
        Ok(())
    }

    fn resolve_limit(
        requested: Option<usize>,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<usize, SearchError> {
        match requested {
            None => Ok(default_limit),
            Some(0) => Err(SearchError::validation("limit must be greater than 0")),
            Some(limit) => Ok(limit.min(max_limit)),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
