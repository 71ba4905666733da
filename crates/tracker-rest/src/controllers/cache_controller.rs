//! Cache administration controller.

use crate::{
    responses::{ApiResult, AppError},
    state::AppState,
};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};
use tracker_core::addresses::{CACHE_PURGE, CACHE_STORE, STORE_PURGE, STORE_WRITE};
use tracker_core::{TrackerError, TrackerResult, TrackingRecord};

/// Outcome of a bulk fill.
#[derive(Debug, Serialize)]
pub struct FillResponse {
    /// Records handed to the cache and the store.
    pub records: usize,
}

/// Creates the cache router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cache/fill", get(fill_cache))
        .route("/cache/purge", get(purge_cache))
}

/// Reads the fill file into records. Entries that are not valid records
/// are logged and skipped.
pub async fn read_fill_data(path: &Path) -> TrackerResult<Vec<TrackingRecord>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        TrackerError::internal(format!("Cannot read fill data {}: {}", path.display(), e))
    })?;
    let entries: Vec<Value> = serde_json::from_str(&raw)
        .map_err(|e| TrackerError::internal(format!("Fill data is not a JSON array: {}", e)))?;

    let records = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match TrackingRecord::from_document(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping invalid fill entry");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Loads the fill file into both the local cache and the backing store.
async fn fill_cache(State(state): State<AppState>) -> ApiResult<Json<FillResponse>> {
    info!(path = %state.fill_data_path.display(), "Filling caches with data");
    let records = read_fill_data(&state.fill_data_path).await?;

    for record in &records {
        debug!(program_id = %record.program_id, "Filling record");
        let document = record.to_document();
        state.dispatcher.send(CACHE_STORE, document.clone()).await?;
        state.dispatcher.send(STORE_WRITE, document).await?;
    }

    Ok(Json(FillResponse {
        records: records.len(),
    }))
}

/// Empties the backing store and the local cache.
async fn purge_cache(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    info!("Purging caches");
    state.dispatcher.send(STORE_PURGE, Value::Null).await?;
    state.dispatcher.send(CACHE_PURGE, Value::Null).await?;
    Ok(Json(Value::Object(serde_json::Map::new())))
}
