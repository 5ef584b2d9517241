//! Error types for the product search repository.
//!
//! This module provides a unified error type for all search operations.

mod search_error;

pub use search_error::SearchError;
