use serde::{Deserialize, Serialize};

/// A single image/tag pair a task expects to observe running together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image: String,
    pub tag: String,
}

impl Image {
    /// The `"{image}:{tag}"` form the controller reports in
    /// `status.summary.images`. Comparison is exact, case-sensitive.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    pub fn is_valid(&self) -> bool {
        !self.image.is_empty() && !self.tag.is_empty()
    }
}
