//! Popular term aggregation job.
//!
//! Periodically folds new search history into `popular_search_terms`. Each
//! pass reads history past the stored cursor, groups it by canonical term and
//! applies the increments together with the cursor advance as one
//! compare-and-set, so a window is never counted twice.

use std::sync::Arc;

use chrono::Utc;
use product_search_repository::types::TermRollup;
use product_search_repository::{PopularTermsRepository, SearchError, SearchHistoryRepository};
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the aggregation job.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Time between passes.
    pub interval: Duration,
    /// History rows read per batch.
    pub batch_size: usize,
    /// Only rows older than this are aggregated.
    ///
    /// Gives in-flight history inserts time to commit so that an id assigned
    /// earlier is never committed behind the cursor.
    pub settle: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 1000,
            settle: Duration::from_secs(5),
        }
    }
}

/// What a single pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationOutcome {
    /// Roll-ups applied.
    pub batches: usize,
    /// History rows folded in.
    pub records: usize,
    /// Term increments written.
    pub increments: usize,
}

/// Rolls search history up into popular term counts.
pub struct PopularTermAggregator {
    history: Arc<dyn SearchHistoryRepository>,
    popular: Arc<dyn PopularTermsRepository>,
    config: AggregatorConfig,
}

impl PopularTermAggregator {
    /// Create an aggregator with default configuration.
    pub fn new(
        history: Arc<dyn SearchHistoryRepository>,
        popular: Arc<dyn PopularTermsRepository>,
    ) -> Self {
        Self::with_config(history, popular, AggregatorConfig::default())
    }

    /// Create an aggregator with custom configuration.
    pub fn with_config(
        history: Arc<dyn SearchHistoryRepository>,
        popular: Arc<dyn PopularTermsRepository>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            history,
            popular,
            config,
        }
    }

    /// Run one pass: aggregate every settled history row past the cursor.
    ///
    /// Stops early if another run advanced the cursor concurrently; the next
    /// pass picks up from wherever that run left it.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<AggregationOutcome, SearchError> {
        let cutoff = chrono::Duration::from_std(self.config.settle)
            .ok()
            .and_then(|settle| Utc::now().checked_sub_signed(settle));
        let Some(cutoff) = cutoff else {
            warn!(
                settle_secs = self.config.settle.as_secs(),
                "Settle window out of range, nothing to aggregate"
            );
            return Ok(AggregationOutcome::default());
        };
        let batch_size = self.config.batch_size.max(1);

        let mut outcome = AggregationOutcome::default();

        loop {
            let cursor = self.popular.aggregation_cursor().await?;
            let records = self
                .history
                .records_after(cursor, cutoff, batch_size)
                .await?;

            let rollup = TermRollup::from_history(cursor, &records);
            if rollup.is_noop() {
                break;
            }

            if !self.popular.apply_rollup(&rollup).await? {
                debug!(cursor = cursor, "Cursor moved by a concurrent run");
                break;
            }

            outcome.batches += 1;
            outcome.records += records.len();
            outcome.increments += rollup.increments.len();

            debug!(
                previous_cursor = rollup.previous_cursor,
                next_cursor = rollup.next_cursor,
                records = records.len(),
                "Applied popular term roll-up"
            );

            if records.len() < batch_size {
                break;
            }
        }

        Ok(outcome)
    }

    /// Run passes on the configured interval until `shutdown` fires.
    ///
    /// A failed pass is logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            settle_secs = self.config.settle.as_secs(),
            "Starting popular term aggregator"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(outcome) if outcome.batches > 0 => {
                            info!(
                                batches = outcome.batches,
                                records = outcome.records,
                                increments = outcome.increments,
                                "Popular terms updated"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "Popular term aggregation failed");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Popular term aggregator stopped");
                    break;
                }
            }
        }
    }
}
