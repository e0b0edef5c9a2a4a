//! Item CRUD and status transition handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use kiez_core::{
    CreateItemRequest, ImageRepository, ItemCategory, ItemFilter, ItemRepository, ItemStatus,
    ListingForm, OwnerRepository, OwnerRole, UpdateItemRequest,
};

use crate::{require_owner, ApiError, AppState, CurrentUser};

pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.db.items.list(filter).await?;
    Ok(Json(items))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.db.items.get(id).await?;
    let images = state.db.images.list_for_item(id).await?;
    Ok(Json(serde_json::json!({
        "item": item,
        "images": images,
    })))
}

/// Direct item creation, outside the wizard flow. The body mirrors the
/// wizard's details form; the rooms-are-rent-only coercion applies here
/// too via form validation.
pub async fn create_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(form): Json<ListingForm>,
) -> Result<impl IntoResponse, ApiError> {
    let validated = form.validate().map_err(|missing| {
        ApiError::BadRequest(format!(
            "missing required fields: {}",
            missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;

    let req: CreateItemRequest = validated.into_create_request(user_id);
    let id = state.db.items.insert(req).await?;
    state
        .db
        .owners
        .add(id, user_id, OwnerRole::Owner, None)
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Distinguishes an explicit `null` (clear the column) from an absent
/// field (leave it untouched).
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    pub condition: Option<kiez_core::ItemCondition>,
    pub listing_type: Option<kiez_core::ListingType>,
    #[serde(default, deserialize_with = "present")]
    pub sale_price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub rental_price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub rental_period: Option<Option<kiez_core::RentalPeriod>>,
}

pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateItemBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, id, user_id).await?;

    state
        .db
        .items
        .update(
            id,
            UpdateItemRequest {
                title: body.title,
                description: body.description,
                category: body.category,
                condition: body.condition,
                listing_type: body.listing_type,
                sale_price: body.sale_price,
                rental_price: body.rental_price,
                rental_period: body.rental_period,
                status: None,
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    pub status: ItemStatus,
}

pub async fn set_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, id, user_id).await?;

    state
        .db
        .items
        .update(
            id,
            UpdateItemRequest {
                status: Some(body.status),
                ..Default::default()
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&state, id, user_id).await?;
    state.db.items.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Category labels the database accepts right now, in enum order.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let values = state.db.items.category_values().await?;
    Ok(Json(values))
}
