pub mod metrics;

pub use metrics::Metrics;

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{Status, Task};
use crate::store::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drives one task from `in progress` to a terminal status (§4.3). The
/// caller has already written `task` to the store with status
/// `in progress` and scheduled this future on its own `tokio::spawn` —
/// `run` never blocks the ingress and never returns early on a
/// transport error; it only stops at one of the three terminal
/// transitions or at the deadline.
pub async fn run(state: AppState, task: Task) {
    let deadline = Instant::now() + Duration::from_secs(state.config.argo_timeout);

    loop {
        if Instant::now() >= deadline {
            finish(&state, &task, Status::Failed).await;
            return;
        }

        match state.controller.refresh(&task.app).await {
            Ok(404) => {
                finish(&state, &task, Status::AppNotFound).await;
                return;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    task_id = %task.id, app = %task.app, error = %err,
                    "refresh failed, retrying within deadline",
                );
            }
        }

        match state.controller.get_app_status(&task.app).await {
            Ok(Some(status))
                if task.images_satisfied(&status.images)
                    && status.synced == "Synced"
                    && status.healthy == "Healthy" =>
            {
                finish(&state, &task, Status::Deployed).await;
                return;
            }
            Ok(Some(_)) => {
                tracing::debug!(task_id = %task.id, app = %task.app, "not yet synced and healthy");
            }
            Ok(None) => {
                tracing::debug!(task_id = %task.id, app = %task.app, "application not ready yet");
            }
            Err(err) => {
                tracing::warn!(
                    task_id = %task.id, app = %task.app, error = %err,
                    "status fetch failed, retrying within deadline",
                );
            }
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Writes the terminal status and its observability side-effects (§4.3):
/// the `failed_deployment` gauge is incremented on `failed` and reset to
/// 0 on `deployed`; `app not found` touches no counter.
async fn finish(state: &AppState, task: &Task, status: Status) {
    if let Err(err) = state.store.update_task(&task.id, status).await {
        tracing::error!(task_id = %task.id, error = %err, "failed to record terminal status");
    }

    match status {
        Status::Deployed => state.metrics.reset_failed(&task.app),
        Status::Failed => state.metrics.record_failed(&task.app),
        Status::AppNotFound => {}
        Status::Accepted | Status::InProgress | Status::TaskNotFound => {
            unreachable!("finish is only ever called with a terminal status")
        }
    }

    tracing::info!(task_id = %task.id, app = %task.app, %status, "task reached a terminal status");
}
