use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiError;
use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/apps", get(list_apps))
}

async fn list_apps(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let mut apps: Vec<String> = state.store.get_app_list().await?.into_iter().collect();
    apps.sort();
    Ok(Json(apps))
}
