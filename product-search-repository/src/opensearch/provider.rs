//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `ProductIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    IndexParts, OpenSearch, SearchParts,
};
use product_search_shared::{ProductDocument, SearchResultItem};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchError;
use crate::filter::PredicateClause;
use crate::interfaces::ProductIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{
    BatchOperationResult, BatchOperationSummary, EffectiveSort, ProductPage, ProductQuery,
};

/// Boost of a whole-word token match over a prefix-only match.
const EXACT_MATCH_BOOST: f64 = 2.0;

/// OpenSearch provider implementation.
///
/// Every query token must match `searchable_text` either as a word or as a
/// word prefix; whole-word matches score higher.
///
/// # Example
///
/// ```ignore
/// use product_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
///
/// let config = IndexConfig::new("products", 0);
/// let provider = OpenSearchProvider::new("http://localhost:9200", config).await?;
/// provider.ensure_index_exists().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias and version
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Build the `bool.must` text clauses, one per token.
    fn text_clauses(query: &ProductQuery) -> Vec<Value> {
        query
            .query
            .tokens()
            .iter()
            .map(|token| {
                json!({
                    "bool": {
                        "should": [
                            { "match": { "searchable_text": { "query": token, "boost": EXACT_MATCH_BOOST } } },
                            { "prefix": { "searchable_text": { "value": token } } }
                        ],
                        "minimum_should_match": 1
                    }
                })
            })
            .collect()
    }

    /// Build the `bool.filter` clauses from the predicate.
    fn filter_clauses(query: &ProductQuery) -> Vec<Value> {
        let mut price_range = serde_json::Map::new();
        let mut filters = Vec::new();

        for clause in query.predicate.clauses() {
            match clause {
                PredicateClause::CategoryEquals(category_id) => {
                    filters.push(json!({ "term": { "category_id": category_id.to_string() } }));
                }
                PredicateClause::PriceAtLeast(min) => {
                    price_range.insert("gte".to_string(), json!(min));
                }
                PredicateClause::PriceAtMost(max) => {
                    price_range.insert("lte".to_string(), json!(max));
                }
                PredicateClause::MaterialEquals(material) => {
                    filters.push(json!({ "term": { "material": material } }));
                }
                PredicateClause::StyleEquals(style) => {
                    filters.push(json!({ "term": { "style": style } }));
                }
                PredicateClause::InStock(in_stock) => {
                    filters.push(json!({ "term": { "in_stock": in_stock } }));
                }
            }
        }

        if !price_range.is_empty() {
            filters.push(json!({ "range": { "price": price_range } }));
        }

        filters
    }

    fn sort_clauses(sort: EffectiveSort) -> Value {
        let primary = match sort {
            EffectiveSort::Relevance => json!({ "_score": { "order": "desc" } }),
            EffectiveSort::PriceAscending => json!({ "price": { "order": "asc" } }),
            EffectiveSort::PriceDescending => json!({ "price": { "order": "desc" } }),
            EffectiveSort::Newest => json!({ "created_at": { "order": "desc" } }),
        };
        json!([primary, { "id": { "order": "asc" } }])
    }

    /// Build the full search request body.
    fn build_search_body(query: &ProductQuery) -> Value {
        let text = Self::text_clauses(query);
        let filters = Self::filter_clauses(query);

        let bool_query = if text.is_empty() {
            json!({ "must": [{ "match_all": {} }], "filter": filters })
        } else {
            json!({ "must": text, "filter": filters })
        };

        json!({
            "query": { "bool": bool_query },
            "sort": Self::sort_clauses(query.sort),
            "from": query.offset,
            "size": query.limit,
            "track_total_hits": true,
            "track_scores": true
        })
    }

    /// Parse a search response into a page.
    fn parse_search_response(body: &Value) -> Result<ProductPage, SearchError> {
        let hits = &body["hits"];

        let total_count = hits["total"]["value"]
            .as_u64()
            .ok_or_else(|| SearchError::retrieval("Response is missing hits.total.value"))?;

        let items = hits["hits"]
            .as_array()
            .map(|hits| hits.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|hit| {
                let product: ProductDocument = serde_json::from_value(hit["_source"].clone())
                    .map_err(|e| SearchError::retrieval(format!("Malformed document: {}", e)))?;
                Ok(SearchResultItem {
                    product,
                    relevance_score: hit["_score"].as_f64().unwrap_or(0.0),
                })
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        Ok(ProductPage { items, total_count })
    }

    async fn index_product(&self, product: &ProductDocument) -> Result<(), SearchError> {
        let doc_id = product.id.to_string();
        let body = serde_json::to_value(product).map_err(|e| SearchError::write(e.to_string()))?;

        let response = self
            .client
            .index(IndexParts::IndexId(&self.index_config.alias, &doc_id))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::write(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchError::write(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %doc_id, "Product indexed");
        Ok(())
    }
}

#[async_trait]
impl ProductIndexProvider for OpenSearchProvider {
    /// Create the versioned index with its alias if it does not exist yet.
    async fn ensure_index_exists(&self) -> Result<(), SearchError> {
        let index_name = self.index_config.versioned_index_name();

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&index_name]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(index = %index_name, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(get_index_settings(&self.index_config.alias))
            .send()
            .await
            .map_err(|e| SearchError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index_name, alias = %self.index_config.alias, "Created product index");
        Ok(())
    }

    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[&self.index_config.alias]))
            .body(Self::build_search_body(query))
            .send()
            .await
            .map_err(|e| SearchError::retrieval(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Search request failed");
            return Err(SearchError::retrieval(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::retrieval(e.to_string()))?;

        Self::parse_search_response(&body)
    }

    /// Index each product individually and summarize the outcomes.
    async fn index_products(
        &self,
        products: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        let mut results = Vec::with_capacity(products.len());

        for product in products {
            let outcome = self.index_product(product).await;
            results.push(BatchOperationResult {
                product_id: product.id,
                success: outcome.is_ok(),
                error: outcome.err(),
            });
        }

        Ok(BatchOperationSummary::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{compose, Predicate};
    use crate::query::NormalizedQuery;
    use product_search_shared::FilterSet;
    use uuid::Uuid;

    fn product_query(text: &str, predicate: Predicate, sort: EffectiveSort) -> ProductQuery {
        ProductQuery {
            query: NormalizedQuery::parse(text),
            predicate,
            sort,
            offset: 12,
            limit: 12,
        }
    }

    #[test]
    fn test_text_clause_per_token() {
        let query = product_query("Gold Ring", Predicate::match_all(), EffectiveSort::Relevance);
        let body = OpenSearchProvider::build_search_body(&query);

        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(
            must[0]["bool"]["should"][1]["prefix"]["searchable_text"]["value"],
            "gold"
        );
        assert_eq!(
            must[1]["bool"]["should"][0]["match"]["searchable_text"]["query"],
            "ring"
        );
        assert_eq!(body["sort"][0]["_score"]["order"], "desc");
        assert_eq!(body["sort"][1]["id"]["order"], "asc");
        assert_eq!(body["from"], 12);
        assert_eq!(body["size"], 12);
    }

    #[test]
    fn test_empty_query_is_match_all() {
        let query = product_query("", Predicate::match_all(), EffectiveSort::Newest);
        let body = OpenSearchProvider::build_search_body(&query);

        assert!(body["query"]["bool"]["must"][0]["match_all"].is_object());
        assert_eq!(body["sort"][0]["created_at"]["order"], "desc");
    }

    #[test]
    fn test_filters_become_filter_clauses() {
        let category = Uuid::new_v4();
        let predicate = compose(
            &FilterSet::new()
                .with_category(category)
                .with_price_range(Some(5.0), Some(50.0))
                .with_style("vintage")
                .in_stock_only(),
        )
        .unwrap();
        let query = product_query("ring", predicate, EffectiveSort::PriceAscending);
        let body = OpenSearchProvider::build_search_body(&query);

        let filters = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 4);
        assert_eq!(filters[0]["term"]["category_id"], category.to_string());
        assert_eq!(filters[1]["term"]["style"], "vintage");
        assert_eq!(filters[2]["term"]["in_stock"], true);
        assert_eq!(filters[3]["range"]["price"]["gte"], 5.0);
        assert_eq!(filters[3]["range"]["price"]["lte"], 50.0);
    }

    #[test]
    fn test_parse_search_response() {
        let product = ProductDocument::new(Uuid::new_v4(), "Gold Ring", None, 120.0);
        let body = json!({
            "hits": {
                "total": { "value": 7, "relation": "eq" },
                "hits": [
                    { "_id": product.id.to_string(), "_score": 1.5, "_source": product }
                ]
            }
        });

        let page = OpenSearchProvider::parse_search_response(&body).unwrap();
        assert_eq!(page.total_count, 7);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].product.id, product.id);
        assert_eq!(page.items[0].relevance_score, 1.5);
    }

    #[test]
    fn test_parse_search_response_without_total_is_an_error() {
        let body = json!({ "hits": { "hits": [] } });
        let err = OpenSearchProvider::parse_search_response(&body).unwrap_err();
        assert!(matches!(err, SearchError::RetrievalError(_)));
    }
}
