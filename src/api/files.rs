//! File API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateFileRequest, File, UpdateFileRequest};
use crate::AppState;

/// POST /api/files - Attach a file to a review.
pub async fn create_file(
    State(state): State<AppState>,
    Json(request): Json<CreateFileRequest>,
) -> ApiResult<File> {
    success(state.repo.create_file(&request).await?)
}

/// GET /api/files/:id - Get a single file.
pub async fn get_file(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<File> {
    match state.repo.get_file(&id).await {
        Ok(Some(file)) => success(file),
        Ok(None) => Err(AppError::NotFound(format!("File {} not found", id))),
        Err(e) => Err(e),
    }
}

/// PUT /api/files/:id - Update a file.
pub async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateFileRequest>,
) -> ApiResult<File> {
    success(state.repo.update_file(&id, &request).await?)
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.delete_file(&id).await?;
    success(())
}
