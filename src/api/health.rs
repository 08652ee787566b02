use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// `up` iff both the controller session and the backing store are
/// reachable (§7) — a durable-store connection failure or a poisoned
/// transaction must surface here just as loudly as a controller outage.
async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (controller_up, store_up) = tokio::join!(state.controller.check(), state.store.health());

    if controller_up && store_up {
        (StatusCode::OK, Json(HealthResponse { status: "up" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "down" }),
        )
    }
}
