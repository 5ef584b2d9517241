//! In-memory backends.
//!
//! Process-local implementations of the provider traits for tests and local
//! development without a database. Ranking is a simplified word-prefix score,
//! not a replica of any datastore's relevance function.

mod popular_terms;
mod product_index;
mod search_history;

pub use popular_terms::MemoryPopularTerms;
pub use product_index::MemoryProductIndex;
pub use search_history::MemorySearchHistory;
