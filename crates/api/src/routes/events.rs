//! Lifecycle event and change-record intake endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::LifecycleEvent;
use fanout::{ChangeRecord, DeadLetterSink, FanOut, FanOutReport};
use registrar::RegistrarClient;
use saga::{DoiEvent, EventSink, LifecycleHandler, ResourceResolver};

use crate::bus::InProcessBus;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R, V, E, D> {
    pub handler: Arc<LifecycleHandler<R, V, E>>,
    pub fanout: FanOut<InProcessBus<R, V, E>, D>,
}

/// POST /events: runs the saga for one lifecycle event.
pub async fn handle<R, V, E, D>(
    State(state): State<Arc<AppState<R, V, E, D>>>,
    Json(event): Json<LifecycleEvent>,
) -> Result<Json<DoiEvent>, ApiError>
where
    R: RegistrarClient + Clone + 'static,
    V: ResourceResolver + Clone + 'static,
    E: EventSink + 'static,
    D: DeadLetterSink + 'static,
{
    metrics::counter!("api_events_received_total", "event_type" => event.event_type())
        .increment(1);
    let emitted = state.handler.handle(&event).await?;
    Ok(Json(emitted))
}

/// POST /changes: fans a delivery of change records out as lifecycle events.
pub async fn changes<R, V, E, D>(
    State(state): State<Arc<AppState<R, V, E, D>>>,
    Json(records): Json<Vec<ChangeRecord>>,
) -> Result<(StatusCode, Json<FanOutReport>), ApiError>
where
    R: RegistrarClient + Clone + 'static,
    V: ResourceResolver + Clone + 'static,
    E: EventSink + 'static,
    D: DeadLetterSink + 'static,
{
    let report = state.fanout.process(&records).await?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}
