//! Buy/rent request handlers.
//!
//! Status transitions are permissioned in the repository: only the
//! item's owner may accept or decline, only the requester may cancel,
//! and only pending requests transition at all.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kiez_core::{RequestRepository, RequestStatus};

use crate::{ApiError, AppState, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub item_id: Uuid,
    pub message: Option<String>,
}

pub async fn create_request(
    State(state): State<AppState>,
    CurrentUser(requester_id): CurrentUser,
    Json(body): Json<CreateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .db
        .requests
        .create(body.item_id, requester_id, body.message)
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

pub async fn get_request(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state.db.requests.get(id).await?;
    if request.requester_id != user_id && request.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "Request visible only to its parties".to_string(),
        ));
    }
    Ok(Json(request))
}

/// Requests sent by or addressed to the caller, newest first.
pub async fn list_requests(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.db.requests.list_for_user(user_id).await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
pub struct SetRequestStatusBody {
    pub status: RequestStatus,
}

pub async fn set_request_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRequestStatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.requests.set_status(id, user_id, body.status).await?;
    Ok(StatusCode::NO_CONTENT)
}
