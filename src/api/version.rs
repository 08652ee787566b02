use axum::Router;
use axum::routing::get;
use axum::Json;
use serde::Serialize;

use crate::store::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/version", get(version))
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    version: &'static str,
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::controller::ControllerClient;
    use crate::engine::Metrics;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn reports_the_crate_version() {
        let config = Arc::new(Config {
            argo_url: "http://localhost".into(),
            argo_user: "u".into(),
            argo_password: "p".into(),
            argo_timeout: 5,
            state_type: "in-memory".into(),
            ssl_verify: true,
            history_ttl: 3600,
            db_host: None,
            db_port: 5432,
            db_name: None,
            db_user: None,
            db_password: None,
            log_level: "INFO".into(),
            bind_ip: "0.0.0.0".into(),
        });
        let state = AppState {
            store: Arc::new(MemoryStore::with_history_ttl(config.history_ttl)),
            controller: Arc::new(ControllerClient::new(
                config.argo_url.clone(),
                config.argo_user.clone(),
                config.argo_password.clone(),
                config.ssl_verify,
            )),
            metrics: Arc::new(Metrics::new()),
            config,
        };

        let request = axum::http::Request::get("/api/v1/version")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = router().with_state(state).oneshot(request).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
