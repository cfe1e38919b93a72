//! Liveness probe.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /health: the process is up and serving.
///
/// Registrar reachability is not probed here; a failing registrar shows up
/// as 502s on `/events` instead.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "doi-lifecycle",
        version: env!("CARGO_PKG_VERSION"),
    })
}
