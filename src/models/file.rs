//! File model.

use serde::{Deserialize, Serialize};

/// A file attached to a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub review_id: String,
    pub name: String,
    pub description: String,
    pub accepted: bool,
}

/// Request body for attaching a file to a review.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFileRequest {
    pub review_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub accepted: bool,
}

/// Request body for updating a file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub accepted: Option<bool>,
}
