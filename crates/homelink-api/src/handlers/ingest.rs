//! Reading ingestion endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use homelink_devices::{BatchReport, DeviceError};

use super::ServerState;
use crate::error::{ApiError, HandlerResult};

/// Ingest a batch of device reading envelopes.
///
/// The batch is best-effort: per-item failures are collected in the
/// report, only a non-list payload is rejected outright.
pub async fn ingest_readings_handler(
    State(state): State<ServerState>,
    Json(batch): Json<Value>,
) -> HandlerResult<Json<BatchReport>> {
    let report = state.pipeline.ingest_batch(batch).await.map_err(|error| {
        match error {
            DeviceError::InvalidBatchShape => {
                ApiError::BadRequest("payload must be a list of reading envelopes".to_string())
            }
            other => other.into(),
        }
    })?;
    Ok(Json(report))
}
