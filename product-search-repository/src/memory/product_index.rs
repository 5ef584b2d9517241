//! In-memory product index.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use product_search_shared::{ProductDocument, SearchResultItem};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::SearchError;
use crate::interfaces::ProductIndexProvider;
use crate::query::NormalizedQuery;
use crate::types::{
    BatchOperationResult, BatchOperationSummary, EffectiveSort, ProductPage, ProductQuery,
};

/// Score contributed by a token equal to a whole word.
const EXACT_WORD_SCORE: f64 = 1.0;

/// Score contributed by a token that only prefixes a word.
const PREFIX_WORD_SCORE: f64 = 0.5;

/// Product index held in process memory.
///
/// Documents are keyed by product id; indexing the same id again replaces it.
pub struct MemoryProductIndex {
    products: RwLock<BTreeMap<Uuid, ProductDocument>>,
}

impl MemoryProductIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create an index pre-populated with `products`.
    pub fn with_products(products: impl IntoIterator<Item = ProductDocument>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    /// Number of indexed products.
    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    /// Returns true if nothing is indexed.
    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }

    /// Score a document against the query tokens.
    ///
    /// Returns `None` unless every token prefixes some word of the searchable
    /// text. The empty query matches everything with score 0.
    fn score(query: &NormalizedQuery, product: &ProductDocument) -> Option<f64> {
        let words = Self::words(&product.searchable_text);

        query.tokens().iter().try_fold(0.0, |score, token| {
            let word_score = words
                .iter()
                .filter_map(|word| {
                    if word == token {
                        Some(EXACT_WORD_SCORE)
                    } else if word.starts_with(token.as_str()) {
                        Some(PREFIX_WORD_SCORE)
                    } else {
                        None
                    }
                })
                .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))?;
            Some(score + word_score)
        })
    }

    /// Lowercase words of the searchable text, split at every
    /// non-alphanumeric character ("Rose-gold" is `rose` and `gold`).
    fn words(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn compare(sort: EffectiveSort, a: &SearchResultItem, b: &SearchResultItem) -> Ordering {
        let primary = match sort {
            EffectiveSort::Relevance => b.relevance_score.total_cmp(&a.relevance_score),
            EffectiveSort::PriceAscending => a.product.price.total_cmp(&b.product.price),
            EffectiveSort::PriceDescending => b.product.price.total_cmp(&a.product.price),
            EffectiveSort::Newest => b.product.created_at.cmp(&a.product.created_at),
        };
        primary.then_with(|| a.product.id.cmp(&b.product.id))
    }
}

impl Default for MemoryProductIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductIndexProvider for MemoryProductIndex {
    async fn ensure_index_exists(&self) -> Result<(), SearchError> {
        Ok(())
    }

    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, SearchError> {
        let products = self.products.read().await;

        let mut matches: Vec<SearchResultItem> = products
            .values()
            .filter(|product| query.predicate.matches(product))
            .filter_map(|product| {
                Self::score(&query.query, product).map(|relevance_score| SearchResultItem {
                    product: product.clone(),
                    relevance_score,
                })
            })
            .collect();

        matches.sort_by(|a, b| Self::compare(query.sort, a, b));

        let total_count = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .collect();

        Ok(ProductPage { items, total_count })
    }

    async fn index_products(
        &self,
        products: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        let mut stored = self.products.write().await;

        let results = products
            .iter()
            .map(|product| {
                stored.insert(product.id, product.clone());
                BatchOperationResult {
                    product_id: product.id,
                    success: true,
                    error: None,
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }
}
