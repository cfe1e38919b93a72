//! Outbound events announcing completed identifier transitions.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Doi, TenantId};
use registrar::IdentifierState;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Events emitted after a saga completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DoiEvent {
    /// A new identifier was minted with metadata and landing page.
    DoiCreated(DoiEventData),

    /// An identifier's metadata and landing page were (re)registered.
    DoiFindable(DoiEventData),

    /// A findable identifier was moved back to registered.
    DoiDeregistered(DoiEventData),

    /// A draft identifier was deleted.
    DraftDeleted(DoiEventData),

    /// The saga ran but nothing needed to change.
    Unchanged(DoiEventData),
}

/// Data shared by all identifier events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoiEventData {
    /// Unique event ID.
    pub event_id: Uuid,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Identifier the event is about, if one exists.
    pub doi: Option<Doi>,
    /// Resource the identifier points at.
    pub resource_uri: Option<Url>,
    /// Resource recorded as identical, for de-registrations of duplicates.
    pub duplicate_of: Option<Url>,
    /// Registrar state observed when nothing changed.
    pub observed_state: Option<IdentifierState>,
    /// When the event was created.
    pub occurred_at: DateTime<Utc>,
}

impl DoiEventData {
    fn new(tenant_id: &TenantId, doi: Option<&Doi>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            tenant_id: tenant_id.clone(),
            doi: doi.cloned(),
            resource_uri: None,
            duplicate_of: None,
            observed_state: None,
            occurred_at: Utc::now(),
        }
    }
}

impl DoiEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DoiEvent::DoiCreated(_) => "DoiCreated",
            DoiEvent::DoiFindable(_) => "DoiFindable",
            DoiEvent::DoiDeregistered(_) => "DoiDeregistered",
            DoiEvent::DraftDeleted(_) => "DraftDeleted",
            DoiEvent::Unchanged(_) => "Unchanged",
        }
    }

    /// Returns the event data.
    pub fn data(&self) -> &DoiEventData {
        match self {
            DoiEvent::DoiCreated(data)
            | DoiEvent::DoiFindable(data)
            | DoiEvent::DoiDeregistered(data)
            | DoiEvent::DraftDeleted(data)
            | DoiEvent::Unchanged(data) => data,
        }
    }

    /// Creates a DoiCreated event.
    pub fn created(tenant_id: &TenantId, doi: &Doi, resource_uri: &Url) -> Self {
        DoiEvent::DoiCreated(DoiEventData {
            resource_uri: Some(resource_uri.clone()),
            ..DoiEventData::new(tenant_id, Some(doi))
        })
    }

    /// Creates a DoiFindable event.
    pub fn findable(tenant_id: &TenantId, doi: &Doi, resource_uri: &Url) -> Self {
        DoiEvent::DoiFindable(DoiEventData {
            resource_uri: Some(resource_uri.clone()),
            ..DoiEventData::new(tenant_id, Some(doi))
        })
    }

    /// Creates a DoiDeregistered event.
    pub fn deregistered(tenant_id: &TenantId, doi: &Doi, duplicate_of: Option<&Url>) -> Self {
        DoiEvent::DoiDeregistered(DoiEventData {
            duplicate_of: duplicate_of.cloned(),
            ..DoiEventData::new(tenant_id, Some(doi))
        })
    }

    /// Creates a DraftDeleted event.
    pub fn draft_deleted(tenant_id: &TenantId, doi: &Doi) -> Self {
        DoiEvent::DraftDeleted(DoiEventData::new(tenant_id, Some(doi)))
    }

    /// Creates an Unchanged event.
    pub fn unchanged(
        tenant_id: &TenantId,
        doi: Option<&Doi>,
        observed_state: Option<IdentifierState>,
    ) -> Self {
        DoiEvent::Unchanged(DoiEventData {
            observed_state,
            ..DoiEventData::new(tenant_id, doi)
        })
    }
}

/// Error returned by an [`EventSink`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Destination for outbound identifier events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    async fn emit(&self, event: &DoiEvent) -> Result<(), SinkError>;
}

/// Sink that writes events to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: &DoiEvent) -> Result<(), SinkError> {
        let data = event.data();
        let payload = serde_json::to_string(event).map_err(|e| SinkError(e.to_string()))?;
        tracing::info!(
            event_type = event.event_type(),
            event_id = %data.event_id,
            tenant = %data.tenant_id,
            %payload,
            "identifier event"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryEventSinkState {
    events: Vec<DoiEvent>,
    fail_on_emit: bool,
}

/// In-memory event sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSink {
    state: Arc<RwLock<InMemoryEventSinkState>>,
}

impl InMemoryEventSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to reject events.
    pub fn set_fail_on_emit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_emit = fail;
    }

    /// Returns every event emitted so far.
    pub fn events(&self) -> Vec<DoiEvent> {
        self.state.read().unwrap().events.clone()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn emit(&self, event: &DoiEvent) -> Result<(), SinkError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_emit {
            return Err(SinkError("bus unavailable".to_string()));
        }
        state.events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doi() -> Doi {
        Doi::new("10.5072", "abc").unwrap()
    }

    #[test]
    fn test_event_type() {
        let tenant = TenantId::new("unit");
        let uri = Url::parse("https://x/pub/1").unwrap();

        assert_eq!(DoiEvent::created(&tenant, &doi(), &uri).event_type(), "DoiCreated");
        assert_eq!(DoiEvent::findable(&tenant, &doi(), &uri).event_type(), "DoiFindable");
        assert_eq!(
            DoiEvent::deregistered(&tenant, &doi(), None).event_type(),
            "DoiDeregistered"
        );
        assert_eq!(DoiEvent::draft_deleted(&tenant, &doi()).event_type(), "DraftDeleted");
        assert_eq!(DoiEvent::unchanged(&tenant, None, None).event_type(), "Unchanged");
    }

    #[test]
    fn test_deregistered_data() {
        let tenant = TenantId::new("unit");
        let original = Url::parse("https://x/pub/2").unwrap();
        let event = DoiEvent::deregistered(&tenant, &doi(), Some(&original));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DoiDeregistered");
        assert_eq!(json["data"]["doi"], "10.5072/abc");
        assert_eq!(json["data"]["duplicate_of"], "https://x/pub/2");

        let back: DoiEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unchanged_records_observed_state() {
        let tenant = TenantId::new("unit");
        let event = DoiEvent::unchanged(&tenant, Some(&doi()), Some(IdentifierState::Registered));
        assert_eq!(event.data().observed_state, Some(IdentifierState::Registered));
    }

    #[tokio::test]
    async fn test_in_memory_sink() {
        let sink = InMemoryEventSink::new();
        let tenant = TenantId::new("unit");
        sink.emit(&DoiEvent::draft_deleted(&tenant, &doi())).await.unwrap();
        assert_eq!(sink.events().len(), 1);

        sink.set_fail_on_emit(true);
        assert!(sink.emit(&DoiEvent::draft_deleted(&tenant, &doi())).await.is_err());
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let tenant = TenantId::new("unit");
        assert!(
            TracingEventSink
                .emit(&DoiEvent::draft_deleted(&tenant, &doi()))
                .await
                .is_ok()
        );
    }
}
