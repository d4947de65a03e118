//! Reviewer model.

use serde::{Deserialize, Serialize};

/// A person reviewing datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub affiliation: String,
}

/// Request body for creating a new reviewer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewerRequest {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub affiliation: String,
}

/// Request body for updating an existing reviewer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewerRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}
