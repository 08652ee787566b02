pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::controller::ControllerClient;
use crate::domain::{Status, Task};
use crate::engine::Metrics;

/// The capability set both store variants satisfy (§4.1). The engine and
/// ingress depend only on this trait, never on a concrete variant —
/// constructed once at startup and shared as `Arc<dyn TaskStore>`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stamps `created = now`, sets `status`, and inserts. Returns a
    /// conflict error if `id` already exists — see DESIGN.md's resolution
    /// of the duplicate-id ambiguity.
    async fn set_current_task(&self, task: Task, status: Status) -> Result<(), StoreError>;

    /// Returns the stored status, or the `task not found` sentinel when
    /// the id is unknown or has been evicted. Never an `Err` for a miss.
    async fn get_task_status(&self, id: &str) -> Result<Status, StoreError>;

    /// Stamps `updated = now` and overwrites `status`. A miss is a silent
    /// no-op — callers never rely on it raising.
    async fn update_task(&self, id: &str, status: Status) -> Result<(), StoreError>;

    /// Every task whose `created` lies in `[from_ts, to_ts or now]`,
    /// optionally filtered by exact `app` equality.
    async fn get_state(
        &self,
        from_ts: f64,
        to_ts: Option<f64>,
        app: Option<&str>,
    ) -> Result<Vec<Task>, StoreError>;

    /// The set of distinct `app` values currently retained.
    async fn get_app_list(&self) -> Result<HashSet<String>, StoreError>;

    /// `true` when the backing store is reachable. The in-memory variant
    /// has no external dependency and is always healthy.
    async fn health(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task already exists: {0}")]
    Conflict(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<StoreError> for crate::error::ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => Self::Conflict(format!("task {id} already exists")),
            StoreError::Db(e) => Self::from(e),
        }
    }
}

/// Shared application state threaded through every handler and the engine.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub controller: Arc<ControllerClient>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<Config>,
}
