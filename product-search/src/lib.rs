//! # Product Search
//!
//! Storefront product search service: ranked, filtered search over the
//! catalog projection, autocomplete, trending and recent searches, served
//! over HTTP.
//!
//! ## Architecture
//!
//! 1. **Server**: Axum routes translating HTTP into service calls
//! 2. **Service**: `ProductSearchService` from `product-search-repository`
//! 3. **Aggregator**: Periodic roll-up of search history into popular terms
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`server`]: HTTP routes and handlers
//! - [`aggregator`]: Popular term roll-up job
//! - [`errors`]: Error types for the service

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod server;

pub use aggregator::{AggregationOutcome, AggregatorConfig, PopularTermAggregator};
pub use config::{Dependencies, Settings};
pub use errors::ServiceError;
