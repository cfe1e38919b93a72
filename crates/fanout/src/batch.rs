//! Batches of bus entries and per-entry failure results.

use common::LifecycleEvent;
use serde::{Deserialize, Serialize};

/// One opaque bus entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Correlates the entry back to the record it was derived from.
    pub source_ref: String,
    /// Entry type, used by the bus for routing.
    pub detail_type: String,
    /// Entry body.
    pub payload: serde_json::Value,
}

impl BatchEntry {
    /// Creates an entry.
    pub fn new(
        source_ref: impl Into<String>,
        detail_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            source_ref: source_ref.into(),
            detail_type: detail_type.into(),
            payload,
        }
    }

    /// Wraps a lifecycle event, typed by its event name.
    pub fn from_event(
        event: &LifecycleEvent,
        source_ref: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            source_ref,
            event.event_type(),
            serde_json::to_value(event)?,
        ))
    }

    /// Reads the payload back as a lifecycle event.
    pub fn to_event(&self) -> Result<LifecycleEvent, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Entries submitted together in one bus call.
///
/// Batches are built for one attempt and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_refs(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.source_ref.as_str()).collect()
    }
}

impl FromIterator<BatchEntry> for Batch {
    fn from_iter<I: IntoIterator<Item = BatchEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// An entry the bus did not accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEntry {
    /// The entry exactly as it was submitted.
    pub entry: BatchEntry,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl FailedEntry {
    pub fn new(entry: BatchEntry) -> Self {
        Self {
            entry,
            error_code: None,
            error_message: None,
        }
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }
}

/// Outcome of one bus call: the entries that failed. Everything else was accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult {
    pub failed: Vec<FailedEntry>,
}

impl PartialResult {
    /// A result in which every entry was accepted.
    pub fn success() -> Self {
        Self::default()
    }

    /// A result in which every entry of `batch` failed with the same error.
    pub fn all_failed(batch: &Batch, code: &str, message: &str) -> Self {
        Self {
            failed: batch
                .entries()
                .iter()
                .cloned()
                .map(|entry| FailedEntry::new(entry).with_error(code, message))
                .collect(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Builds the next attempt's batch from the failed entries, in their original order.
    pub fn retry_batch(&self) -> Batch {
        self.failed.iter().map(|f| f.entry.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn entry(source_ref: &str) -> BatchEntry {
        BatchEntry::new(source_ref, "Test", serde_json::json!({ "ref": source_ref }))
    }

    #[test]
    fn test_entry_from_event() {
        let event =
            LifecycleEvent::identifier_approved("unit", Url::parse("https://x/pub/1").unwrap());
        let entry = BatchEntry::from_event(&event, "pub-1").unwrap();

        assert_eq!(entry.detail_type, "IdentifierApproved");
        assert_eq!(entry.payload["type"], "IdentifierApproved");
        assert_eq!(entry.to_event().unwrap(), event);
    }

    #[test]
    fn test_retry_batch_keeps_failed_entries_unchanged() {
        let result = PartialResult {
            failed: vec![
                FailedEntry::new(entry("b")).with_error("ThrottlingException", "slow down"),
                FailedEntry::new(entry("d")),
            ],
        };

        let retry = result.retry_batch();
        assert_eq!(retry.source_refs(), vec!["b", "d"]);
        assert_eq!(retry.entries()[0], entry("b"));
    }

    #[test]
    fn test_all_failed() {
        let batch: Batch = ["a", "b"].into_iter().map(entry).collect();
        let result = PartialResult::all_failed(&batch, "Transport", "connection reset");

        assert_eq!(result.failed_count(), 2);
        assert!(
            result
                .failed
                .iter()
                .all(|f| f.error_code.as_deref() == Some("Transport"))
        );
        assert!(PartialResult::success().all_succeeded());
    }
}
