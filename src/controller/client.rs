use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

/// The projection of `GET /api/v1/applications/{app}` the engine needs:
/// the reported image set and the sync/health summary (§4.2).
#[derive(Debug, Clone)]
pub struct AppStatus {
    pub images: Vec<String>,
    pub synced: String,
    pub healthy: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("unauthorized: check ARGO_USER/ARGO_PASSWORD")]
    Unauthorized,

    #[error("forbidden: check the firewall")]
    Forbidden,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct SessionUserInfo {
    #[serde(default, rename = "loggedIn")]
    logged_in: bool,
}

#[derive(Deserialize)]
struct ApplicationResponse {
    status: ApplicationStatus,
}

#[derive(Deserialize)]
struct ApplicationStatus {
    summary: Summary,
    sync: SyncStatus,
    health: HealthStatus,
}

#[derive(Deserialize)]
struct Summary {
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
struct SyncStatus {
    status: String,
}

#[derive(Deserialize)]
struct HealthStatus {
    status: String,
}

/// Wraps HTTPS calls to the deployment controller. Holds a cookie-based
/// session established by `authenticate`; `reqwest`'s cookie store
/// replays it automatically, mirroring the source's `requests.Session`.
/// The client performs no retry of its own — that is the verification
/// engine's concern (§4.2).
pub struct ControllerClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    authenticated: AtomicBool,
}

impl ControllerClient {
    pub fn new(base_url: impl Into<String>, user: String, password: String, ssl_verify: bool) -> Self {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!ssl_verify)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("building the controller HTTP client should never fail");

        Self {
            http,
            base_url: base_url.into(),
            user,
            password,
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }

    /// `POST /api/v1/session`. On transport failure the client logs and
    /// stays unauthenticated rather than erroring — later probes will
    /// simply keep failing, which is sufficient signal.
    pub async fn authenticate(&self) -> Result<(), ControllerError> {
        let response = match self
            .http
            .post(format!("{}/api/v1/session", self.base_url))
            .json(&json!({"username": self.user, "password": self.password}))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "failed to reach the deployment controller");
                return Ok(());
            }
        };

        match response.status().as_u16() {
            200 => {
                self.authenticated.store(true, Ordering::Relaxed);
                Ok(())
            }
            401 => {
                tracing::error!("Unauthorized, please check credentials");
                Err(ControllerError::Unauthorized)
            }
            403 => {
                tracing::error!("Forbidden, please check the firewall");
                Err(ControllerError::Forbidden)
            }
            status => {
                tracing::error!(status, "unexpected response authenticating with the controller");
                Ok(())
            }
        }
    }

    /// `GET /api/v1/session/userinfo`. `up` iff the body decodes and
    /// carries `loggedIn: true`; a missing/malformed body is `down`.
    pub async fn check(&self) -> bool {
        let response = match self
            .http
            .get(format!("{}/api/v1/session/userinfo", self.base_url))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "health check request failed");
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        response
            .json::<SessionUserInfo>()
            .await
            .map(|body| body.logged_in)
            .unwrap_or(false)
    }

    /// `GET /api/v1/applications/{app}?refresh=normal`. Returns the raw
    /// status code — `404` is the caller's signal that `app` is unknown.
    pub async fn refresh(&self, app: &str) -> Result<u16, ControllerError> {
        let response = self
            .http
            .get(format!(
                "{}/api/v1/applications/{app}?refresh=normal",
                self.base_url
            ))
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    /// `GET /api/v1/applications/{app}`. `None` on any non-200 response.
    pub async fn get_app_status(&self, app: &str) -> Result<Option<AppStatus>, ControllerError> {
        let response = self
            .http
            .get(format!("{}/api/v1/applications/{app}", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: ApplicationResponse = match response.json().await {
            Ok(body) => body,
            Err(_) => return Ok(None),
        };

        Ok(Some(AppStatus {
            images: body.status.summary.images,
            synced: body.status.sync.status,
            healthy: body.status.health.status,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> ControllerClient {
        ControllerClient::new(base_url, "user".into(), "password".into(), true)
    }

    #[tokio::test]
    async fn authenticate_succeeds_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/session"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        client.authenticate().await.unwrap();
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn authenticate_fails_loudly_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/session"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, ControllerError::Unauthorized));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn check_is_up_only_when_logged_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/session/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"loggedIn": true})))
            .mount(&server)
            .await;

        assert!(client(&server.uri()).check().await);
    }

    #[tokio::test]
    async fn check_is_down_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/session/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(!client(&server.uri()).check().await);
    }

    #[tokio::test]
    async fn refresh_returns_the_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/applications/missing_app"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(client(&server.uri()).refresh("missing_app").await.unwrap(), 404);
    }

    #[tokio::test]
    async fn get_app_status_projects_the_summary() {
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

        let status = client(&server.uri())
            .get_app_status("test_app")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.images, vec!["example:latest".to_string()]);
        assert_eq!(status.synced, "Synced");
        assert_eq!(status.healthy, "Healthy");
    }

    #[tokio::test]
    async fn get_app_status_is_none_on_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/applications/test_app"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(client(&server.uri())
            .get_app_status("test_app")
            .await
            .unwrap()
            .is_none());
    }
}
