//! Direct messaging handlers. Conversations are derived from the
//! message rows, grouped by counterpart and item; nothing extra is
//! stored.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kiez_core::{MessageRepository, SendMessageRequest};

use crate::{ApiError, AppState, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub recipient_id: Uuid,
    pub item_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub content: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(sender_id): CurrentUser,
    Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .db
        .messages
        .send(SendMessageRequest {
            sender_id,
            recipient_id: body.recipient_id,
            item_id: body.item_id,
            request_id: body.request_id,
            content: body.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state.db.messages.conversations(user_id).await?;
    Ok(Json(conversations))
}

pub async fn get_thread(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(counterpart_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.db.messages.thread(user_id, counterpart_id).await?;
    Ok(Json(messages))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(counterpart_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.db.messages.mark_read(user_id, counterpart_id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.db.messages.unread_count(user_id).await?;
    Ok(Json(serde_json::json!({ "unread": count })))
}
