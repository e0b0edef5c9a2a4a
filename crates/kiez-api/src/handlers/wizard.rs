//! The two listing-wizard endpoints.

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use kiez_core::{AiInvocationMode, ListingForm, SubmitMode};

use crate::services::SubmitDetailsRequest;
use crate::{request_language, ApiError, AppState, CurrentUser};

/// `POST /api/wizard/images` (multipart).
///
/// Fields: `mode` (`with_ai` | `skip_ai` | `skip_images`) and optionally
/// `invocation` (`inline_blocking` | `background` | `fire_and_forget`),
/// plus the image files. Responds with the draft id, stored image URLs,
/// the enqueued job id (with_ai only), the terminal job status (inline
/// only), and any rejected files.
pub async fn submit_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (fields, images) = super::read_multipart(multipart).await?;

    let mode = match super::field(&fields, "mode") {
        Some("with_ai") | None => SubmitMode::WithAi,
        Some("skip_ai") => SubmitMode::SkipAi,
        Some("skip_images") => SubmitMode::SkipImages,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("Unknown mode: {}", other)));
        }
    };

    let invocation = match super::field(&fields, "invocation") {
        Some("background") | None => AiInvocationMode::Background,
        Some("inline_blocking") => AiInvocationMode::InlineBlocking,
        Some("fire_and_forget") => AiInvocationMode::FireAndForget,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown invocation mode: {}",
                other
            )));
        }
    };

    let language = request_language(&headers);
    let outcome = state
        .wizard
        .submit_images(user_id, &language, mode, invocation, images)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /api/wizard/details` (multipart).
///
/// Form fields mirror [`ListingForm`]; `draft_item_id` links back to the
/// image step, and any attached files are uploaded after the existing
/// gallery.
pub async fn submit_details(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (fields, new_images) = super::read_multipart(multipart).await?;

    let text = |name: &str| super::field(&fields, name).unwrap_or_default().to_string();
    let form = ListingForm {
        title: text("title"),
        description: text("description"),
        category: text("category"),
        condition: text("condition"),
        listing_type: text("listing_type"),
        sale_price: text("sale_price"),
        rental_price: text("rental_price"),
        rental_period: text("rental_period"),
    };

    let draft_item_id = match super::field(&fields, "draft_item_id") {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<Uuid>()
                .map_err(|_| ApiError::BadRequest("Invalid draft_item_id".to_string()))?,
        ),
        _ => None,
    };

    let item_id = state
        .wizard
        .submit_details(
            user_id,
            SubmitDetailsRequest {
                form,
                draft_item_id,
                new_images,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": item_id })),
    ))
}
