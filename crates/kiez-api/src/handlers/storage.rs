//! Serves stored objects over HTTP.
//!
//! Deployments without a dedicated storage front point `PUBLIC_BASE_URL`
//! back at this server, so the URLs written into `item_images` resolve
//! here. Signed URLs are verified when the signature parameters are
//! present; transform parameters are accepted and ignored, objects are
//! served as stored.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use kiez_db::{ObjectStore, IMAGES_BUCKET, THUMBNAILS_BUCKET};

use crate::{ApiError, AppState};

#[derive(Deserialize)]
pub struct ServeQuery {
    expires: Option<i64>,
    signature: Option<String>,
}

/// GET /storage/:bucket/*key
pub async fn serve_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<ServeQuery>,
) -> Result<Response, ApiError> {
    if bucket != IMAGES_BUCKET && bucket != THUMBNAILS_BUCKET {
        return Err(ApiError::NotFound(format!("Unknown bucket {}", bucket)));
    }

    if let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) {
        state.store.verify(&bucket, &key, expires, signature)?;
    }

    let data = state
        .store
        .download(&bucket, &key)
        .await
        .map_err(|_| ApiError::NotFound(format!("No object at {}/{}", bucket, key)))?;

    let content_type = ObjectStore::content_type(&data);
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
