pub mod apps;
pub mod extract;
pub mod health;
pub mod metrics;
pub mod tasks;
pub mod version;

use axum::Router;

use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(tasks::router())
        .merge(apps::router())
        .merge(health::router())
        .merge(version::router())
        .merge(metrics::router())
}
