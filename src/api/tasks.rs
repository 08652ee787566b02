use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Status, Task, TaskSubmission};
use crate::error::ApiError;
use crate::store::AppState;

use super::extract::ValidatedJson;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/tasks", post(submit_task).get(list_tasks))
        .route("/api/v1/tasks/{id}", get(get_task_status))
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    status: Status,
    id: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: Status,
}

#[derive(Debug, Deserialize)]
struct ListTasksParams {
    from_timestamp: f64,
    to_timestamp: Option<f64>,
    app: Option<String>,
}

/// `POST /api/v1/tasks`. Writes `in progress` to the store before
/// returning, then schedules the engine on its own task — the handler
/// never awaits verification.
#[tracing::instrument(skip(state, body))]
async fn submit_task(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<TaskSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = body.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let id = Uuid::new_v4().to_string();
    let task = Task::new(id.clone(), body, crate::time::now_secs());

    state
        .store
        .set_current_task(task.clone(), Status::InProgress)
        .await?;

    tokio::spawn(crate::engine::run(state, task));

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: Status::Accepted,
            id,
        }),
    ))
}

async fn get_task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.store.get_task_status(&id).await?;
    Ok(Json(StatusResponse { status }))
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state
        .store
        .get_state(params.from_timestamp, params.to_timestamp, params.app.as_deref())
        .await?;
    Ok(Json(tasks))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;
    use crate::controller::ControllerClient;
    use crate::engine::Metrics;
    use crate::store::memory::MemoryStore;

    fn test_config(argo_url: String) -> Config {
        Config {
            argo_url,
            argo_user: "user".into(),
            argo_password: "password".into(),
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
        }
    }

    fn app(server: &MockServer) -> axum::Router {
        let config = Arc::new(test_config(server.uri()));
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
        router().with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn submit_accepts_a_well_formed_task_and_assigns_a_uuid() {
        let server = MockServer::start().await;
        let request = axum::http::Request::post("/api/v1/tasks")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({
                    "app": "test_app",
                    "author": "a",
                    "project": "p",
                    "images": [{"image": "example", "tag": "latest"}],
                })
                .to_string(),
            ))
            .unwrap();

        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "accepted");
        assert_eq!(body["id"].as_str().unwrap().len(), 36);
    }

    #[tokio::test]
    async fn submit_rejects_empty_required_fields_with_422() {
        let server = MockServer::start().await;
        let request = axum::http::Request::post("/api/v1/tasks")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({"app": "", "author": "a", "project": "p", "images": []}).to_string(),
            ))
            .unwrap();

        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn submit_rejects_unparsable_json_with_422_not_400() {
        let server = MockServer::start().await;
        let request = axum::http::Request::post("/api/v1/tasks")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not valid json"))
            .unwrap();

        let response = app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn status_query_reflects_store_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/applications/test_app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {
                    "summary": {"images": ["example:latest"]},
                    "sync": {"status": "Synced"},
                    "health": {"status": "Healthy"},
                }
            })))
            .mount(&server)
            .await;

        let app = app(&server);
        let submit = axum::http::Request::post("/api/v1/tasks")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({
                    "app": "test_app",
                    "author": "a",
                    "project": "p",
                    "images": [{"image": "example", "tag": "latest"}],
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(submit).await.unwrap();
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let query = axum::http::Request::get(format!("/api/v1/tasks/{id}"))
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(query).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "deployed");
    }

    #[tokio::test]
    async fn unknown_task_id_reports_task_not_found() {
        let server = MockServer::start().await;
        let request = axum::http::Request::get("/api/v1/tasks/missing")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app(&server).oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "task not found");
    }
}
