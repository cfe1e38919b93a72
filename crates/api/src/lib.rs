//! HTTP intake for DOI lifecycle events.
//!
//! Accepts lifecycle events and storage change records, runs the matching
//! sagas, and exposes structured logging (tracing) and Prometheus metrics.

pub mod bus;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fanout::{BatchPublisher, DeadLetterSink, FanOut};
use metrics_exporter_prometheus::PrometheusHandle;
use registrar::{RegistrarClient, TenantConfigProvider};
use saga::{EventSink, LifecycleHandler, ResourceResolver};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bus::InProcessBus;
use routes::events::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, V, E, D>(
    state: Arc<AppState<R, V, E, D>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    R: RegistrarClient + Clone + 'static,
    V: ResourceResolver + Clone + 'static,
    E: EventSink + 'static,
    D: DeadLetterSink + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events", post(routes::events::handle::<R, V, E, D>))
        .route("/changes", post(routes::events::changes::<R, V, E, D>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the lifecycle handler and the fan-out stage around one registrar client.
///
/// Fan-out entries are delivered to the same handler that serves `/events`.
pub fn create_state<R, V, E, D>(
    registrar: R,
    resolver: V,
    tenants: TenantConfigProvider,
    events: E,
    dead_letters: D,
    fanout_max_attempts: u32,
) -> Arc<AppState<R, V, E, D>>
where
    R: RegistrarClient + Clone + 'static,
    V: ResourceResolver + Clone + 'static,
    E: EventSink + 'static,
    D: DeadLetterSink + 'static,
{
    let handler = Arc::new(LifecycleHandler::new(registrar, resolver, tenants, events));
    let publisher = BatchPublisher::new(InProcessBus::new(handler.clone()), fanout_max_attempts);

    Arc::new(AppState {
        handler,
        fanout: FanOut::new(publisher, dead_letters),
    })
}
