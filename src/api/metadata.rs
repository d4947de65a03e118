//! Metadatablock, compound and field API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Compound, Field, Metadatablock, UpdateCompoundRequest, UpdateFieldRequest,
    UpdateMetadatablockRequest,
};
use crate::AppState;

/// GET /api/metadatablocks/:id - Get a block with its fields and compounds.
pub async fn get_metadatablock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Metadatablock> {
    match state.repo.get_metadatablock(&id).await {
        Ok(Some(block)) => success(block),
        Ok(None) => Err(AppError::NotFound(format!("Metadatablock {} not found", id))),
        Err(e) => Err(e),
    }
}

/// PUT /api/metadatablocks/:id - Update a block's description.
pub async fn update_metadatablock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateMetadatablockRequest>,
) -> ApiResult<Metadatablock> {
    success(state.repo.update_metadatablock(&id, &request).await?)
}

/// DELETE /api/metadatablocks/:id - Delete a block.
pub async fn delete_metadatablock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_metadatablock(&id).await?;
    success(())
}

/// GET /api/compounds/:id - Get a compound with its fields and chat.
pub async fn get_compound(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Compound> {
    match state.repo.get_compound(&id).await {
        Ok(Some(compound)) => success(compound),
        Ok(None) => Err(AppError::NotFound(format!("Compound {} not found", id))),
        Err(e) => Err(e),
    }
}

/// PUT /api/compounds/:id - Update a compound.
pub async fn update_compound(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCompoundRequest>,
) -> ApiResult<Compound> {
    let compound = state.repo.update_compound(&id, &request).await?;
    tracing::debug!(compound_id = %id, accepted = compound.accepted, "Compound updated");
    success(compound)
}

/// DELETE /api/compounds/:id - Delete a compound.
pub async fn delete_compound(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_compound(&id).await?;
    success(())
}

/// GET /api/fields/:id - Get a field with its chat.
pub async fn get_field(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Field> {
    match state.repo.get_field(&id).await {
        Ok(Some(field)) => success(field),
        Ok(None) => Err(AppError::NotFound(format!("Field {} not found", id))),
        Err(e) => Err(e),
    }
}

/// PUT /api/fields/:id - Update a field's value, description or decision.
pub async fn update_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateFieldRequest>,
) -> ApiResult<Field> {
    let field = state.repo.update_field(&id, &request).await?;
    tracing::debug!(field_id = %id, accepted = ?field.accepted, "Field updated");
    success(field)
}

/// DELETE /api/fields/:id - Delete a field.
pub async fn delete_field(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.delete_field(&id).await?;
    success(())
}
