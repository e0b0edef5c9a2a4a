//! Processing job handlers, including the per-item SSE status stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use uuid::Uuid;

use kiez_core::{ItemRepository, ProcessingJobRepository};

use crate::{require_owner, ApiError, AppState, CurrentUser};

/// The newest job for an item, which is the authoritative one. Older
/// rows are retained as history but never surfaced here.
pub async fn latest_job(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state
        .db
        .jobs
        .latest_for_item(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No processing job for item {}", item_id)))?;
    Ok(Json(job))
}

/// `GET /api/items/:id/jobs/events`: SSE stream of job status changes
/// for one item, fed by the worker through the in-process job feed.
///
/// Delivery is at-least-once; a client that sees a gap should re-read
/// the latest job row. The subscription ends when the client disconnects.
pub async fn job_events(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let subscription = state.feed.subscribe_item(item_id);

    let stream = futures::stream::unfold(subscription, |mut sub| async move {
        let event = sub.next().await?;
        let payload = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(_) => return None,
        };
        Some((
            Ok(Event::default()
                .event(event.status.to_string())
                .data(payload)),
            sub,
        ))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    )
}

/// Re-enqueue a failed job as a fresh pending row. History is
/// append-only; the old row keeps its error message.
pub async fn retry_job(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.db.jobs.get(job_id).await?;
    // Wizard drafts have no owner rows yet; the creating user counts.
    let item = state.db.items.get(job.item_id).await?;
    if item.user_id != user_id {
        require_owner(&state, job.item_id, user_id).await?;
    }

    let new_id = state.db.jobs.retry(job_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": new_id })),
    ))
}
