//! OpenSearch implementation of the product index provider.
//!
//! This module provides a concrete implementation of `ProductIndexProvider`
//! using OpenSearch as the backend.

mod index_config;
mod provider;

pub use index_config::IndexConfig;
pub use provider::OpenSearchProvider;
