//! Interface definitions for the search backends.
//!
//! These traits allow dependency injection and swappable backends (Postgres,
//! OpenSearch, in-memory) behind `ProductSearchService`.

mod popular_terms;
mod product_index_provider;
mod search_history;

pub use popular_terms::PopularTermsRepository;
pub use product_index_provider::ProductIndexProvider;
pub use search_history::SearchHistoryRepository;
