//! Gallery management handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kiez_core::ImageRepository;

use crate::{require_owner, ApiError, AppState, CurrentUser};

pub async fn list_images(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let images = state.db.images.list_for_item(item_id).await?;
    Ok(Json(images))
}

/// `POST /api/items/:id/images` (multipart). Appends to the gallery;
/// uploads never displace the current primary.
pub async fn upload_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, item_id, user_id).await?;

    let (_, images) = super::read_multipart(multipart).await?;
    if images.is_empty() {
        return Err(ApiError::BadRequest("No files in upload".to_string()));
    }

    let existing = state.db.images.list_for_item(item_id).await?.len();
    let selection =
        kiez_core::ImageSelection::from_batch(images, existing, kiez_core::defaults::MAX_IMAGES);
    let rejected = selection.rejected().to_vec();
    let accepted = selection.into_accepted();
    if accepted.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "All files rejected: {}",
            rejected
                .iter()
                .map(|r| format!("{} ({})", r.filename, r.reason))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let urls = state
        .wizard
        .upload_batch(item_id, existing as i32, &accepted)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "image_urls": urls,
            "rejected": rejected,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    /// Full gallery order; must be a permutation of the item's image ids.
    pub ordered_ids: Vec<Uuid>,
}

pub async fn reorder_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(body): Json<ReorderBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, item_id, user_id).await?;
    state.db.images.reorder(item_id, &body.ordered_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes one image; survivors are renumbered densely and the new first
/// image becomes primary.
pub async fn delete_image(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(image_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // Ownership is on the item, so resolve the image's item first.
    let item_id = resolve_item(&state, image_id).await?;
    require_owner(&state, item_id, user_id).await?;
    state.db.images.delete_and_renumber(image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_item(state: &AppState, image_id: Uuid) -> Result<Uuid, ApiError> {
    let item_id: Option<Uuid> =
        sqlx::query_scalar("SELECT item_id FROM item_images WHERE id = $1")
            .bind(image_id)
            .fetch_optional(state.db.pool())
            .await
            .map_err(kiez_core::Error::from)?;
    item_id.ok_or_else(|| ApiError::NotFound(format!("Image {} not found", image_id)))
}
