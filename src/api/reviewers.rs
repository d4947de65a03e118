//! Reviewer API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateReviewerRequest, Reviewer, UpdateReviewerRequest};
use crate::AppState;

/// GET /api/reviewers - List all reviewers.
pub async fn list_reviewers(State(state): State<AppState>) -> ApiResult<Vec<Reviewer>> {
    success(state.repo.list_reviewers().await?)
}

/// GET /api/reviewers/:id - Get a single reviewer.
pub async fn get_reviewer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Reviewer> {
    match state.repo.get_reviewer(&id).await {
        Ok(Some(reviewer)) => success(reviewer),
        Ok(None) => Err(AppError::NotFound(format!("Reviewer {} not found", id))),
        Err(e) => Err(e),
    }
}

/// POST /api/reviewers - Create a new reviewer.
pub async fn create_reviewer(
    State(state): State<AppState>,
    Json(request): Json<CreateReviewerRequest>,
) -> ApiResult<Reviewer> {
    let reviewer = state.repo.create_reviewer(&request).await?;
    tracing::info!(reviewer_id = %reviewer.id, username = %reviewer.username, "Reviewer created");
    success(reviewer)
}

/// PUT /api/reviewers/:id - Update a reviewer.
pub async fn update_reviewer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateReviewerRequest>,
) -> ApiResult<Reviewer> {
    success(state.repo.update_reviewer(&id, &request).await?)
}

/// DELETE /api/reviewers/:id - Delete a reviewer.
pub async fn delete_reviewer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_reviewer(&id).await?;
    tracing::info!(reviewer_id = %id, "Reviewer deleted");
    success(())
}
