//! Review API endpoints, including dataset ingestion and open fields.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::ingest;
use crate::models::{
    FetchDatasetParams, FieldCount, File, OpenMetadatablockFields, Review, UpdateReviewRequest,
};
use crate::openfields;
use crate::AppState;

/// POST /api/reviews/fetch - Ingest a dataset, or return its existing review.
pub async fn fetch_dataset(
    State(state): State<AppState>,
    Query(params): Query<FetchDatasetParams>,
) -> ApiResult<Review> {
    let review = ingest::fetch_dataset(&state.repo, &state.dataverse, &params).await?;
    success(review)
}

/// GET /api/reviews - List all reviews.
pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Vec<Review>> {
    success(state.repo.list_reviews().await?)
}

/// GET /api/reviews/:id - Get a review with its metadata tree.
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Review> {
    match state.repo.get_review(&id).await {
        Ok(Some(review)) => success(review),
        Ok(None) => Err(AppError::NotFound(format!(
            "Review with ID '{}' does not exist.",
            id
        ))),
        Err(e) => Err(e),
    }
}

/// PUT /api/reviews/:id - Update acceptance or reviewer.
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateReviewRequest>,
) -> ApiResult<Review> {
    let review = state.repo.update_review(&id, &request).await?;
    tracing::info!(review_id = %id, accepted = review.accepted, "Review updated");
    success(review)
}

/// DELETE /api/reviews/:id - Delete a review and its tree.
pub async fn delete_review(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.delete_review(&id).await?;
    tracing::info!(review_id = %id, "Review deleted");
    success(())
}

/// GET /api/reviews/doi/*doi - Reviews of one DOI.
pub async fn list_reviews_by_doi(
    State(state): State<AppState>,
    Path(doi): Path<String>,
) -> ApiResult<Vec<Review>> {
    success(state.repo.list_reviews_by_doi(&doi).await?)
}

/// GET /api/reviews/reviewer/:reviewer_id - Reviews assigned to a reviewer.
pub async fn list_reviews_by_reviewer(
    State(state): State<AppState>,
    Path(reviewer_id): Path<String>,
) -> ApiResult<Vec<Review>> {
    success(state.repo.list_reviews_by_reviewer(&reviewer_id).await?)
}

/// GET /api/reviews/:id/field-count - Field totals of a review.
pub async fn get_field_count(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FieldCount> {
    success(state.repo.field_count(&id).await?)
}

/// GET /api/reviews/:id/open-fields - Fields the installation currently defines.
pub async fn get_open_fields(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<OpenMetadatablockFields>> {
    success(openfields::open_fields_for_review(&state.repo, &state.dataverse, &id).await?)
}

/// GET /api/reviews/:id/files - Files attached to a review.
pub async fn list_review_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<File>> {
    success(state.repo.list_files_by_review(&id).await?)
}
