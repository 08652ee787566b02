use axum::Router;
use axum::extract::State;
use axum::routing::get;

use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.encode()
}
