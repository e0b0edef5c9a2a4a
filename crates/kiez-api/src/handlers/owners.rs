//! Item ownership handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kiez_core::{OwnerRepository, OwnerRole};

use crate::{require_owner, ApiError, AppState, CurrentUser};

pub async fn list_owners(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let owners = state.db.owners.list_for_item(item_id).await?;
    Ok(Json(owners))
}

#[derive(Debug, Deserialize)]
pub struct AddOwnerBody {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: Option<OwnerRole>,
}

pub async fn add_owner(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(body): Json<AddOwnerBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, item_id, actor).await?;

    let id = state
        .db
        .owners
        .add(
            item_id,
            body.user_id,
            body.role.unwrap_or(OwnerRole::CoOwner),
            Some(actor),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Removing the last remaining owner is refused by the repository.
pub async fn remove_owner(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((item_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, item_id, actor).await?;
    state.db.owners.remove(item_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
