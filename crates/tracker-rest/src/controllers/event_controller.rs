//! Event resolution controller.

use crate::{
    responses::{program_not_found, require_id, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{debug, warn};
use tracker_core::addresses::{RESOLVE, STORE_DELETE, STREAM_PUBLISH};
use tracker_core::{is_not_found, DeleteRequest, ResolveRequest, TrackerError, TrackingRecord};
use uuid::Uuid;

/// Creates the event router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/event/", get(missing_id))
        .route("/event/:event_id", get(track_event))
        .route("/event/delete/", get(missing_id))
        .route("/event/delete/:event_id", get(delete_event))
}

async fn missing_id() -> AppError {
    AppError(TrackerError::validation("event id is required"))
}

/// Resolves a program id, enriches it with the caller's user agent and
/// publishes it downstream.
async fn track_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let program_id = require_id(&event_id)?;
    let request = ResolveRequest::new(program_id, Uuid::new_v4().to_string());
    debug!(program_id, message_id = ?request.message_id, "Track event request");

    let reply = state.dispatcher.request(RESOLVE, request.to_document()).await?;
    if is_not_found(&reply) {
        return Ok(program_not_found());
    }

    let mut record = TrackingRecord::from_document(&reply)?;
    record.user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let enriched = record.to_document();
    // the caller never waits on the publisher's inbox
    let dispatcher = state.dispatcher.clone();
    let published = enriched.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher.send(STREAM_PUBLISH, published).await {
            warn!(program_id = %record.program_id, error = %e, "Could not hand record to the publisher");
        }
    });

    Ok((StatusCode::OK, Json(enriched)).into_response())
}

/// Deletes a record from the backing store.
async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let program_id = require_id(&event_id)?;
    debug!(program_id, "Delete event request");

    let reply = state
        .dispatcher
        .request(STORE_DELETE, DeleteRequest::new(program_id).to_document())
        .await?;
    Ok(Json(reply))
}
