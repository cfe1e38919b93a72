//! Bus transport seam.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::batch::{Batch, BatchEntry, FailedEntry, PartialResult};
use crate::error::TransportError;

/// A bus that accepts batches and reports per-entry failures.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// Submits `batch` once.
    ///
    /// Returns the entries the bus rejected. `Err` means the call itself
    /// failed and no entry is known to have been accepted.
    async fn submit(&self, batch: &Batch) -> Result<PartialResult, TransportError>;
}

#[derive(Debug, Clone, Copy)]
enum EntryScript {
    Always,
    Times(usize),
}

#[derive(Debug, Default)]
struct InMemoryBusState {
    scripts: HashMap<String, EntryScript>,
    failing_calls: usize,
    submissions: Vec<Vec<String>>,
    delivered: Vec<BatchEntry>,
}

/// In-memory bus for testing, with scripted per-entry failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBusTransport {
    state: Arc<RwLock<InMemoryBusState>>,
}

impl InMemoryBusTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the entry with `source_ref` on every submission.
    pub fn fail_always(&self, source_ref: &str) {
        self.state
            .write()
            .unwrap()
            .scripts
            .insert(source_ref.to_string(), EntryScript::Always);
    }

    /// Rejects the entry with `source_ref` on its next `times` submissions.
    pub fn fail_times(&self, source_ref: &str, times: usize) {
        self.state
            .write()
            .unwrap()
            .scripts
            .insert(source_ref.to_string(), EntryScript::Times(times));
    }

    /// Fails the next `calls` submissions as a whole.
    pub fn fail_next_calls(&self, calls: usize) {
        self.state.write().unwrap().failing_calls = calls;
    }

    /// Source refs of every submitted batch, in submission order.
    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.state.read().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.read().unwrap().submissions.len()
    }

    /// Every entry the bus accepted.
    pub fn delivered(&self) -> Vec<BatchEntry> {
        self.state.read().unwrap().delivered.clone()
    }
}

#[async_trait]
impl BatchTransport for InMemoryBusTransport {
    async fn submit(&self, batch: &Batch) -> Result<PartialResult, TransportError> {
        let mut state = self.state.write().unwrap();
        state
            .submissions
            .push(batch.source_refs().into_iter().map(String::from).collect());

        if state.failing_calls > 0 {
            state.failing_calls -= 1;
            return Err(TransportError("connection reset".to_string()));
        }

        let mut result = PartialResult::success();
        for entry in batch.entries() {
            let rejected = match state.scripts.get_mut(&entry.source_ref) {
                Some(EntryScript::Always) => true,
                Some(EntryScript::Times(n)) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            };
            if rejected {
                result.failed.push(
                    FailedEntry::new(entry.clone())
                        .with_error("InternalFailure", "entry rejected by bus"),
                );
            } else {
                state.delivered.push(entry.clone());
            }
        }
        Ok(result)
    }
}
