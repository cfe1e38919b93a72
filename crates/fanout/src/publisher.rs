//! Bounded-retry batch publisher.

use crate::batch::{Batch, FailedEntry, PartialResult};
use crate::transport::BatchTransport;

/// Default number of submissions per batch, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Error code recorded on entries whose whole submission failed.
pub const TRANSPORT_ERROR_CODE: &str = "TransportError";

/// Publishes batches, resubmitting only the entries the bus rejected.
///
/// Attempts are strictly sequential. Entries accepted on any attempt are
/// never sent again, and the residue returned at the end is the failed
/// subset of the last attempt, not an accumulation over all attempts.
/// Routing that residue to a dead-letter channel is the caller's job.
#[derive(Debug, Clone)]
pub struct BatchPublisher<T> {
    transport: T,
    max_attempts: u32,
}

impl<T: BatchTransport> BatchPublisher<T> {
    /// Creates a publisher. `max_attempts` is clamped to at least one.
    pub fn new(transport: T, max_attempts: u32) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delivers `batch` and returns the entries still failing after the last attempt.
    #[tracing::instrument(skip_all, fields(entries = batch.len(), max_attempts = self.max_attempts))]
    pub async fn publish(&self, batch: Batch) -> Vec<FailedEntry> {
        let mut pending = batch;
        let mut attempt = 0;

        while !pending.is_empty() {
            attempt += 1;
            metrics::counter!("fanout_attempts_total").increment(1);

            let result = match self.transport.submit(&pending).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "batch submission failed");
                    PartialResult::all_failed(&pending, TRANSPORT_ERROR_CODE, &e.to_string())
                }
            };

            if result.all_succeeded() {
                tracing::debug!(attempt, "batch delivered");
                return Vec::new();
            }

            metrics::counter!("fanout_entries_failed_total").increment(result.failed_count() as u64);
            if attempt >= self.max_attempts {
                tracing::warn!(
                    attempt,
                    still_failing = result.failed_count(),
                    "giving up on failed entries"
                );
                return result.failed;
            }

            tracing::info!(
                attempt,
                failed = result.failed_count(),
                "resubmitting failed entries"
            );
            pending = result.retry_batch();
        }

        Vec::new()
    }
}
