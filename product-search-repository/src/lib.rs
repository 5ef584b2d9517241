//! # Product Search Repository
//!
//! This crate provides the search engine core: query normalization, filter
//! composition, ranked retrieval, fire-and-forget search history, popular term
//! storage and autocomplete merging. Backends sit behind traits with
//! PostgreSQL, OpenSearch and in-memory implementations.

pub mod autocomplete;
pub mod config;
pub mod errors;
pub mod filter;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod postgres;
pub mod query;
pub mod recorder;
pub mod service;
pub mod types;

pub use config::SearchServiceConfig;
pub use errors::SearchError;
pub use filter::{Predicate, PredicateClause};
pub use interfaces::{PopularTermsRepository, ProductIndexProvider, SearchHistoryRepository};
pub use opensearch::OpenSearchProvider;
pub use postgres::{PostgresPopularTerms, PostgresProductIndex, PostgresSearchHistory};
pub use query::NormalizedQuery;
pub use recorder::HistoryRecorder;
pub use service::ProductSearchService;
pub use types::{
    BatchOperationResult, BatchOperationSummary, EffectiveSort, ProductPage, ProductQuery,
    TermIncrement, TermRollup,
};
