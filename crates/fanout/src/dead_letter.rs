//! Dead-letter channel for entries that exhausted their attempts.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::batch::FailedEntry;
use crate::error::TransportError;

/// Secondary channel for entries the bus never accepted.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn send(&self, entries: &[FailedEntry]) -> Result<(), TransportError>;
}

/// Dead-letter sink that logs each entry at error level.
#[derive(Debug, Clone, Default)]
pub struct TracingDeadLetterSink;

#[async_trait]
impl DeadLetterSink for TracingDeadLetterSink {
    async fn send(&self, entries: &[FailedEntry]) -> Result<(), TransportError> {
        for failed in entries {
            let payload = serde_json::to_string(&failed.entry.payload)
                .map_err(|e| TransportError(e.to_string()))?;
            tracing::error!(
                source_ref = %failed.entry.source_ref,
                detail_type = %failed.entry.detail_type,
                error_code = failed.error_code.as_deref().unwrap_or_default(),
                error_message = failed.error_message.as_deref().unwrap_or_default(),
                %payload,
                "entry dead-lettered"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryDeadLetterState {
    entries: Vec<FailedEntry>,
    fail_on_send: bool,
}

/// In-memory dead-letter sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeadLetterSink {
    state: Arc<RwLock<InMemoryDeadLetterState>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    pub fn entries(&self) -> Vec<FailedEntry> {
        self.state.read().unwrap().entries.clone()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn send(&self, entries: &[FailedEntry]) -> Result<(), TransportError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(TransportError("dead-letter queue unavailable".to_string()));
        }
        state.entries.extend_from_slice(entries);
        Ok(())
    }
}
