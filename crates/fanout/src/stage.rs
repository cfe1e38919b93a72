//! Fan-out pipeline stage: change records in, bus entries out.

use serde::Serialize;

use crate::batch::{Batch, BatchEntry};
use crate::change::ChangeRecord;
use crate::dead_letter::DeadLetterSink;
use crate::error::{FanOutError, Result};
use crate::publisher::BatchPublisher;
use crate::transport::BatchTransport;

/// Counts from one run of the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    /// Change records received.
    pub received: usize,
    /// Records that produced a lifecycle event.
    pub published: usize,
    /// Entries handed to the dead-letter sink.
    pub dead_lettered: usize,
}

/// Classifies change records, publishes the resulting events and
/// dead-letters whatever the bus never accepted.
pub struct FanOut<T, D> {
    publisher: BatchPublisher<T>,
    dead_letters: D,
}

impl<T, D> FanOut<T, D>
where
    T: BatchTransport,
    D: DeadLetterSink,
{
    pub fn new(publisher: BatchPublisher<T>, dead_letters: D) -> Self {
        Self {
            publisher,
            dead_letters,
        }
    }

    /// Processes one delivery of change records.
    #[tracing::instrument(skip_all, fields(records = changes.len()))]
    pub async fn process(&self, changes: &[ChangeRecord]) -> Result<FanOutReport> {
        let batch = changes
            .iter()
            .filter_map(|change| {
                change
                    .classify()
                    .map(|event| BatchEntry::from_event(&event, change.resource_id.as_str()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = Batch::new(batch);

        let mut report = FanOutReport {
            received: changes.len(),
            published: batch.len(),
            dead_lettered: 0,
        };
        if batch.is_empty() {
            tracing::debug!("no lifecycle events in changes");
            return Ok(report);
        }

        let residue = self.publisher.publish(batch).await;
        if !residue.is_empty() {
            self.dead_letters
                .send(&residue)
                .await
                .map_err(|source| FanOutError::DeadLetter {
                    count: residue.len(),
                    source,
                })?;
            metrics::counter!("fanout_dead_lettered_total").increment(residue.len() as u64);
            report.dead_lettered = residue.len();
        }

        tracing::info!(
            published = report.published,
            dead_lettered = report.dead_lettered,
            "changes fanned out"
        );
        Ok(report)
    }
}
