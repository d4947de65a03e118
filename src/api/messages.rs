//! Chat message API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateMessageRequest, Message, UpdateMessageRequest};
use crate::AppState;

/// GET /api/messages - List all messages, oldest first.
pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Vec<Message>> {
    success(state.repo.list_messages().await?)
}

/// POST /api/messages - Post a message on a field or compound.
pub async fn create_message(
    State(state): State<AppState>,
    Json(request): Json<CreateMessageRequest>,
) -> ApiResult<Message> {
    success(state.repo.create_message(&request).await?)
}

/// GET /api/messages/:id - Get a single message.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    match state.repo.get_message(&id).await {
        Ok(Some(message)) => success(message),
        Ok(None) => Err(AppError::NotFound(format!("Message {} not found", id))),
        Err(e) => Err(e),
    }
}

/// PUT /api/messages/:id - Edit a message.
pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateMessageRequest>,
) -> ApiResult<Message> {
    success(state.repo.update_message(&id, &request).await?)
}
