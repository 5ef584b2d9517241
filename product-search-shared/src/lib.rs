//! # Product Search Shared
//!
//! This crate defines the data structures shared by the product search engine:
//! the searchable product projection, search requests and result sets, search
//! history records, popular terms and autocomplete suggestions.

pub mod types;

pub use types::product_document::ProductDocument;
pub use types::search_history::{NewSearchRecord, SearchHistoryRecord};
pub use types::search_request::{FilterSet, SearchRequest, SortMode};
pub use types::search_result::{SearchResultItem, SearchResultSet};
pub use types::suggestion::{AutocompleteSuggestion, PopularSearchTerm};
