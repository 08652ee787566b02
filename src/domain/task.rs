use std::fmt;

use serde::{Deserialize, Serialize};

use super::Image;

/// The task status machine. `TaskNotFound` is a query-response sentinel only
/// — it is never written to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "deployed")]
    Deployed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "app not found")]
    AppNotFound,
    #[serde(rename = "task not found")]
    TaskNotFound,
}

impl Status {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Deployed | Self::Failed | Self::AppNotFound)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::InProgress => "in progress",
            Self::Deployed => "deployed",
            Self::Failed => "failed",
            Self::AppNotFound => "app not found",
            Self::TaskNotFound => "task not found",
        }
    }

    /// Parses the exact literal status strings used on the wire and in the
    /// durable store. Unknown input is treated as a store-layer bug, not a
    /// user error, since callers never construct arbitrary status text.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "accepted" => Self::Accepted,
            "in progress" => Self::InProgress,
            "deployed" => Self::Deployed,
            "failed" => Self::Failed,
            "app not found" => Self::AppNotFound,
            "task not found" => Self::TaskNotFound,
            _ => return None,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body a CI pipeline submits. `id`, `status`, and the timestamps are
/// assigned by the ingress, never chosen by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSubmission {
    pub app: String,
    pub author: String,
    pub project: String,
    pub images: Vec<Image>,
}

impl TaskSubmission {
    /// Field-level validation backing the 422 contract on submission.
    /// Returns every violation found, not just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.app.is_empty() {
            errors.push("app must not be empty".into());
        }
        if self.author.is_empty() {
            errors.push("author must not be empty".into());
        }
        if self.project.is_empty() {
            errors.push("project must not be empty".into());
        }
        if self.images.is_empty() {
            errors.push("images must not be empty".into());
        }
        for (i, image) in self.images.iter().enumerate() {
            if !image.is_valid() {
                errors.push(format!("images[{i}] must have a non-empty image and tag"));
            }
        }
        errors
    }
}

/// The unit of work tracked by the verification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub app: String,
    pub author: String,
    pub project: String,
    pub images: Vec<Image>,
    pub status: Status,
    pub created: f64,
    pub updated: f64,
}

impl Task {
    pub fn new(id: String, submission: TaskSubmission, created: f64) -> Self {
        Self {
            id,
            app: submission.app,
            author: submission.author,
            project: submission.project,
            images: submission.images,
            status: Status::InProgress,
            created,
            updated: created,
        }
    }

    /// Every listed image must appear, as `"{image}:{tag}"`, in the
    /// controller-reported image set.
    pub fn images_satisfied(&self, reported: &[String]) -> bool {
        self.images
            .iter()
            .all(|image| reported.contains(&image.reference()))
    }
}
