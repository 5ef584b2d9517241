//! HTTP request handlers.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use product_search_repository::SearchError;
use product_search_shared::{
    AutocompleteSuggestion, FilterSet, ProductDocument, SearchRequest, SearchResultSet, SortMode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::server::state::AppState;

/// Header carrying the opaque requester identity.
pub const REQUESTER_HEADER: &str = "x-requester-id";

/// A search engine error rendered as an HTTP response.
///
/// Validation errors become `400` with their message. Everything else becomes
/// `503` with a generic message; details only go to the log.
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_validation() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "message": self.0.to_string() })),
            )
                .into_response();
        }

        error!(error = %self.0, "Request failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "Search is temporarily unavailable"
            })),
        )
            .into_response()
    }
}

/// Turn a malformed query string into a validation error.
fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError(SearchError::validation(rejection.body_text())))
}

/// Read the requester id header. Missing, blank or non-ASCII values are anonymous.
pub fn requester_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUESTER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Query string of `GET /search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub in_stock_only: Option<bool>,
}

impl SearchParams {
    /// Build a search request, rejecting unknown sort modes.
    pub fn into_request(self) -> Result<SearchRequest, SearchError> {
        let sort = match self.sort.as_deref() {
            Some(sort) => sort.parse::<SortMode>().map_err(SearchError::validation)?,
            None => SortMode::default(),
        };

        let defaults = SearchRequest::new("");
        let filters = FilterSet {
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            material_tag: self.material,
            style_tag: self.style,
            in_stock_only: self.in_stock_only.unwrap_or(false),
        };

        Ok(SearchRequest::new(self.q.unwrap_or_default())
            .with_filters(filters)
            .with_sort(sort)
            .with_page(
                self.page.unwrap_or(defaults.page),
                self.page_size.unwrap_or(defaults.page_size),
            ))
    }
}

/// Query string of `GET /autocomplete`.
#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteParams {
    #[serde(alias = "q")]
    pub prefix: Option<String>,
    pub limit: Option<usize>,
}

/// Query string of the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// One product in a `POST /products/index` body.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexProductRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_in_stock() -> bool {
    true
}

impl From<IndexProductRequest> for ProductDocument {
    fn from(request: IndexProductRequest) -> Self {
        let mut document = ProductDocument::new(
            request.id,
            request.name,
            request.description,
            request.price,
        )
        .with_stock(request.in_stock);

        document.category_id = request.category_id;
        document.material = request.material;
        document.style = request.style;
        if let Some(created_at) = request.created_at {
            document = document.with_created_at(created_at);
        }
        document
    }
}

/// A product that failed to index.
#[derive(Debug, Serialize)]
pub struct IndexFailure {
    pub product_id: Uuid,
    pub error: String,
}

/// Response of `POST /products/index`.
#[derive(Debug, Serialize)]
pub struct IndexProductsResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<IndexFailure>,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Product search is running")
}

/// `GET /search`
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResultSet>, ApiError> {
    let request = query_params(params)?.into_request()?;
    let requester = requester_id(&headers);

    let result = state
        .service
        .search_products(&request, requester.as_deref())
        .await?;

    Ok(Json(result))
}

/// `GET /autocomplete`
pub async fn autocomplete(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<AutocompleteParams>, QueryRejection>,
) -> Result<Json<Vec<AutocompleteSuggestion>>, ApiError> {
    let params = query_params(params)?;
    let requester = requester_id(&headers);
    let prefix = params.prefix.unwrap_or_default();

    let suggestions = state
        .service
        .get_autocomplete_suggestions(&prefix, params.limit, requester.as_deref())
        .await?;

    Ok(Json(suggestions))
}

/// `GET /search/popular`
pub async fn popular_searches(
    State(state): State<AppState>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let params = query_params(params)?;
    let terms = state.service.get_popular_search_terms(params.limit).await?;
    Ok(Json(terms))
}

/// `GET /search/recent`
///
/// Anonymous callers get an empty list.
pub async fn recent_searches(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let params = query_params(params)?;
    let Some(requester) = requester_id(&headers) else {
        return Ok(Json(Vec::new()));
    };

    let queries = state
        .service
        .get_recent_searches(&requester, params.limit)
        .await?;

    Ok(Json(queries))
}

/// `POST /products/index`
pub async fn index_products(
    State(state): State<AppState>,
    Json(products): Json<Vec<IndexProductRequest>>,
) -> Result<(StatusCode, Json<IndexProductsResponse>), ApiError> {
    let documents: Vec<ProductDocument> = products.into_iter().map(Into::into).collect();
    let summary = state.service.index_products(documents).await?;

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Indexed products"
    );

    let failures = summary
        .results
        .into_iter()
        .filter(|r| !r.success)
        .map(|r| IndexFailure {
            product_id: r.product_id,
            error: r.error.map(|e| e.to_string()).unwrap_or_default(),
        })
        .collect();

    let status = if summary.failed == 0 {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((
        status,
        Json(IndexProductsResponse {
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
            failures,
        }),
    ))
}
