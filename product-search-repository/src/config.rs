//! Configuration types for the ProductSearchService.

use std::time::Duration;

/// Configuration for the ProductSearchService.
///
/// Bounds page sizes and suggestion counts, and limits how long a
/// fire-and-forget history write may run.
#[derive(Debug, Clone)]
pub struct SearchServiceConfig {
    /// Largest accepted `page_size`. Defaults to 100.
    pub max_page_size: u32,

    /// Suggestions returned when the caller gives no limit. Defaults to 5.
    pub default_suggestion_limit: usize,

    /// Upper bound for a caller-supplied suggestion limit. Defaults to 20.
    pub max_suggestion_limit: usize,

    /// Trending terms returned when the caller gives no limit. Defaults to 10.
    pub default_popular_limit: usize,

    /// Recent searches returned when the caller gives no limit. Defaults to 10.
    pub default_recent_limit: usize,

    /// Upper bound for popular and recent limits. Defaults to 50.
    pub max_list_limit: usize,

    /// Deadline for a single history insert. Defaults to 2 seconds.
    pub history_write_timeout: Duration,

    /// Maximum number of products in one projection sync.
    ///
    /// Set to `None` to disable the limit (not recommended for production).
    /// Defaults to 1000.
    pub max_batch_size: Option<usize>,
}

impl Default for SearchServiceConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_suggestion_limit: 5,
            max_suggestion_limit: 20,
            default_popular_limit: 10,
            default_recent_limit: 10,
            max_list_limit: 50,
            history_write_timeout: Duration::from_secs(2),
            max_batch_size: Some(1000),
        }
    }
}

impl SearchServiceConfig {
    /// Set the history write deadline.
    pub fn with_history_write_timeout(mut self, timeout: Duration) -> Self {
        self.history_write_timeout = timeout;
        self
    }

    /// Set the largest accepted page size.
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Set the default and maximum suggestion limits.
    pub fn with_suggestion_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_suggestion_limit = default_limit;
        self.max_suggestion_limit = max_limit;
        self
    }

    /// Set the projection sync batch limit.
    pub fn with_max_batch_size(mut self, max_batch_size: Option<usize>) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchServiceConfig::default();
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.default_suggestion_limit, 5);
        assert_eq!(config.history_write_timeout, Duration::from_secs(2));
        assert_eq!(config.max_batch_size, Some(1000));
    }

    #[test]
    fn test_builders() {
        let config = SearchServiceConfig::default()
            .with_history_write_timeout(Duration::from_millis(250))
            .with_max_page_size(48)
            .with_suggestion_limits(8, 8)
            .with_max_batch_size(None);

        assert_eq!(config.history_write_timeout, Duration::from_millis(250));
        assert_eq!(config.max_page_size, 48);
        assert_eq!(config.default_suggestion_limit, 8);
        assert!(config.max_batch_size.is_none());
    }
}
