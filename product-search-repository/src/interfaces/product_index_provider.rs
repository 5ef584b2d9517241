//! Product index provider trait definition.
//!
//! This module defines the abstract interface for ranked, filtered product
//! retrieval, allowing different full-text backends (Postgres, OpenSearch, ...).

use async_trait::async_trait;
use product_search_shared::ProductDocument;

use crate::errors::SearchError;
use crate::types::{BatchOperationSummary, ProductPage, ProductQuery};

/// Abstracts the underlying full-text product index.
///
/// Implementations are injected into `ProductSearchService`. Read operations
/// are stateless and may run concurrently.
///
/// # Index Initialization
///
/// Call `ensure_index_exists` during application startup so that the schema
/// or index is ready before any search is served.
#[async_trait]
pub trait ProductIndexProvider: Send + Sync {
    /// Ensure the index (or the tables backing it) exists, creating it if necessary.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index is ready for use
    /// * `Err(SearchError)` - If initialization fails
    async fn ensure_index_exists(&self) -> Result<(), SearchError>;

    /// Execute a prepared retrieval.
    ///
    /// When `query.query` is non-empty only documents matching every token as a
    /// word prefix qualify, each annotated with the backend's relevance score.
    /// The predicate is intersected with the text match. `total_count` is
    /// computed before the `offset`/`limit` window is applied, and ties in the
    /// requested ordering are broken by product id ascending.
    ///
    /// # Returns
    ///
    /// * `Ok(ProductPage)` - The requested window and the total match count
    /// * `Err(SearchError::RetrievalError)` - If the backend fails to answer
    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, SearchError>;

    /// Upsert searchable projections, returning a per-product summary.
    ///
    /// # Arguments
    ///
    /// * `products` - Projections to create or replace, keyed by product id
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Individual results for each product
    /// * `Err(SearchError)` - If the batch fails entirely
    async fn index_products(
        &self,
        products: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchError>;
}
