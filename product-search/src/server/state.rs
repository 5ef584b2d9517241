//! Shared state for the HTTP handlers.

use std::sync::Arc;

use product_search_repository::ProductSearchService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProductSearchService>,
}
