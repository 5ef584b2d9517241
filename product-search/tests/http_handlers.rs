use std::sync::Arc;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use product_search::server::handlers::{
    self, AutocompleteParams, IndexProductRequest, LimitParams, SearchParams, REQUESTER_HEADER,
};
use product_search::server::state::AppState;
use product_search_repository::memory::{
    MemoryPopularTerms, MemoryProductIndex, MemorySearchHistory,
};
use product_search_repository::{
    BatchOperationSummary, ProductIndexProvider, ProductPage, ProductQuery, ProductSearchService,
    SearchError,
};
use product_search_shared::{PopularSearchTerm, ProductDocument};
use serde_json::json;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

fn catalog() -> Vec<ProductDocument> {
    vec![
        ProductDocument::new(Uuid::from_u128(1), "Gold ring", None, 250.0),
        ProductDocument::new(Uuid::from_u128(2), "Gold chain", None, 120.0).with_stock(false),
        ProductDocument::new(Uuid::from_u128(3), "Silver ring", None, 40.0),
    ]
}

fn state_with(
    products: Vec<ProductDocument>,
    terms: Vec<PopularSearchTerm>,
) -> (AppState, Arc<MemorySearchHistory>) {
    let history = Arc::new(MemorySearchHistory::new());
    let service = ProductSearchService::new(
        Arc::new(MemoryProductIndex::with_products(products)),
        history.clone(),
        Arc::new(MemoryPopularTerms::with_terms(terms)),
    );
    (
        AppState {
            service: Arc::new(service),
        },
        history,
    )
}

fn requester(id: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(REQUESTER_HEADER, HeaderValue::from_static(id));
    headers
}

struct UnavailableIndex;

#[async_trait]
impl ProductIndexProvider for UnavailableIndex {
    async fn ensure_index_exists(&self) -> Result<(), SearchError> {
        Ok(())
    }

    async fn search(&self, _query: &ProductQuery) -> Result<ProductPage, SearchError> {
        Err(SearchError::retrieval("connection refused"))
    }

    async fn index_products(
        &self,
        _products: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        Err(SearchError::retrieval("connection refused"))
    }
}

#[tokio::test]
async fn test_search_applies_filters() {
    let (state, _) = state_with(catalog(), Vec::new());
    let params = SearchParams {
        q: Some("gold".to_string()),
        in_stock_only: Some(true),
        ..SearchParams::default()
    };

    let Json(result) = handlers::search(State(state), HeaderMap::new(), Ok(Query(params)))
        .await
        .unwrap();

    assert_eq!(result.total_count, 1);
    assert_eq!(result.items[0].product.id, Uuid::from_u128(1));
}

#[tokio::test]
async fn test_search_records_history_for_requester() {
    let (state, history) = state_with(catalog(), Vec::new());
    let params = SearchParams {
        q: Some("ring".to_string()),
        ..SearchParams::default()
    };

    handlers::search(State(state), requester("user-9"), Ok(Query(params)))
        .await
        .unwrap();

    for _ in 0..50 {
        if !history.is_empty().await {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }

    let records = history.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].requester_id.as_deref(), Some("user-9"));
    assert_eq!(records[0].query_text, "ring");
    assert_eq!(records[0].result_count, 2);
}

#[tokio::test]
async fn test_invalid_page_is_bad_request() {
    let (state, _) = state_with(catalog(), Vec::new());
    let params = SearchParams {
        page: Some(0),
        ..SearchParams::default()
    };

    let err = handlers::search(State(state), HeaderMap::new(), Ok(Query(params)))
        .await
        .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_page_is_json_bad_request() {
    let (state, _) = state_with(catalog(), Vec::new());

    for query in ["/search?page=-1", "/search?page=abc", "/search?page_size=1.5"] {
        let uri: Uri = query.parse().unwrap();
        let params = Query::<SearchParams>::try_from_uri(&uri);
        let err = handlers::search(State(state.clone()), HeaderMap::new(), params)
            .await
            .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "error");
    }
}

#[tokio::test]
async fn test_backend_failure_is_service_unavailable() {
    let service = ProductSearchService::new(
        Arc::new(UnavailableIndex),
        Arc::new(MemorySearchHistory::new()),
        Arc::new(MemoryPopularTerms::new()),
    );
    let state = AppState {
        service: Arc::new(service),
    };

    let params = Ok(Query(SearchParams::default()));
    let err = handlers::search(State(state), HeaderMap::new(), params)
        .await
        .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_autocomplete_uses_popular_terms() {
    let terms = vec![
        PopularSearchTerm::new("gold ring", 12),
        PopularSearchTerm::new("gold chain", 30),
        PopularSearchTerm::new("silver", 50),
    ];
    let (state, _) = state_with(Vec::new(), terms);
    let params = AutocompleteParams {
        prefix: Some("gol".to_string()),
        limit: Some(5),
    };

    let Json(suggestions) =
        handlers::autocomplete(State(state), HeaderMap::new(), Ok(Query(params)))
            .await
            .unwrap();

    let ordered: Vec<&str> = suggestions.iter().map(|s| s.term.as_str()).collect();
    assert_eq!(ordered, vec!["gold chain", "gold ring"]);
}

#[tokio::test]
async fn test_autocomplete_short_prefix_is_empty() {
    let (state, _) = state_with(Vec::new(), vec![PopularSearchTerm::new("gold", 3)]);
    let params = AutocompleteParams {
        prefix: Some("g".to_string()),
        limit: None,
    };

    let Json(suggestions) =
        handlers::autocomplete(State(state), HeaderMap::new(), Ok(Query(params)))
            .await
            .unwrap();

    assert!(suggestions.is_empty());
}

#[tokio::test]
async fn test_popular_searches_respects_limit() {
    let terms = vec![
        PopularSearchTerm::new("ring", 5),
        PopularSearchTerm::new("chain", 9),
        PopularSearchTerm::new("pearl", 1),
    ];
    let (state, _) = state_with(Vec::new(), terms);

    let params = LimitParams { limit: Some(2) };
    let Json(popular) = handlers::popular_searches(State(state), Ok(Query(params)))
        .await
        .unwrap();

    assert_eq!(popular, vec!["chain".to_string(), "ring".to_string()]);
}

#[tokio::test]
async fn test_recent_searches_anonymous_is_empty() {
    let (state, _) = state_with(catalog(), Vec::new());

    let params = Ok(Query(LimitParams::default()));
    let Json(recent) = handlers::recent_searches(State(state), HeaderMap::new(), params)
        .await
        .unwrap();

    assert!(recent.is_empty());
}

#[tokio::test]
async fn test_index_products_makes_products_searchable() {
    let (state, _) = state_with(Vec::new(), Vec::new());
    let body: Vec<IndexProductRequest> = serde_json::from_value(json!([
        { "id": "00000000-0000-0000-0000-000000000001", "name": "Gold ring", "price": 250.0 },
        { "id": "00000000-0000-0000-0000-000000000002", "name": "Pearl necklace", "price": 300.0 }
    ]))
    .unwrap();

    let (status, Json(response)) = handlers::index_products(State(state.clone()), Json(body))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.total, 2);
    assert_eq!(response.succeeded, 2);
    assert!(response.failures.is_empty());

    let params = SearchParams {
        q: Some("ring".to_string()),
        ..SearchParams::default()
    };
    let Json(result) = handlers::search(State(state), HeaderMap::new(), Ok(Query(params)))
        .await
        .unwrap();
    assert_eq!(result.total_count, 1);
}

#[tokio::test]
async fn test_index_products_rejects_blank_name() {
    let (state, _) = state_with(Vec::new(), Vec::new());
    let body: Vec<IndexProductRequest> = serde_json::from_value(json!([
        { "id": "00000000-0000-0000-0000-000000000002", "name": "   ", "price": 10.0 }
    ]))
    .unwrap();

    let err = handlers::index_products(State(state), Json(body))
        .await
        .unwrap_err();

    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}
