//! Core data structures used across the product search engine.

pub mod product_document;
pub mod search_history;
pub mod search_request;
pub mod search_result;
pub mod suggestion;

pub use product_document::ProductDocument;
pub use search_history::{NewSearchRecord, SearchHistoryRecord};
pub use search_request::{FilterSet, SearchRequest, SortMode};
pub use search_result::{SearchResultItem, SearchResultSet};
pub use suggestion::{AutocompleteSuggestion, PopularSearchTerm};
