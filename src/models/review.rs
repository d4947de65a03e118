//! Review model: one ingested dataset snapshot.

use serde::{Deserialize, Serialize};

use super::{double_option, File, Metadatablock};

/// A review of one dataset, with its metadata tree and attached files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub reviewer_id: Option<String>,
    pub doi: String,
    pub site_url: String,
    pub revision: i64,
    pub accepted: bool,
    pub date: String,
    #[serde(default)]
    pub metadatablocks: Vec<Metadatablock>,
    #[serde(default)]
    pub files: Vec<File>,
}

/// Request body for updating a review.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub accepted: Option<bool>,
    /// `null` detaches the reviewer
    #[serde(default, deserialize_with = "double_option")]
    pub reviewer_id: Option<Option<String>>,
}

/// Query parameters of the fetch-dataset endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchDatasetParams {
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Field totals for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCount {
    pub field_count: i64,
    pub accepted_count: i64,
}
