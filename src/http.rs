//! HTTP surface for daemon mode.
//!
//! Two routes, both recomputing a fresh snapshot per request:
//! - GET /metrics -> pretty-printed snapshot JSON, always 200
//! - GET /health  -> {"ok": bool}, 200 when at least one card reads clean,
//!   503 otherwise
//! Anything else is a 404 with an empty body. The probe holds no shared
//! mutable state, so concurrent requests need no coordination.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::probe::Probe;

#[derive(Clone)]
pub struct AppState {
    pub probe: Probe,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/health", get(get_health))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(app_state)
}

// GET /metrics (full snapshot)
async fn get_metrics(State(app): State<AppState>) -> Response {
    let snapshot = app.probe.snapshot();
    match serde_json::to_string_pretty(&snapshot) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// GET /health (503 until at least one card reads clean)
async fn get_health(State(app): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let ok = app.probe.snapshot().healthy();
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(serde_json::json!({ "ok": ok })))
}
