//! Device management and command handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use homelink_core::{Device, DeviceId, DeviceKind, DeviceLog, RelayAction};

use super::ServerState;
use crate::error::{ApiError, HandlerResult};

/// Query parameters for listing devices.
#[derive(Debug, Deserialize)]
pub struct DeviceFilter {
    /// Filter by device kind
    pub kind: Option<DeviceKind>,
}

/// Device list response.
#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<Device>,
    pub count: usize,
}

/// Request body for registering a device.
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    /// Display name
    pub name: String,
    /// Vendor-side host identifier
    pub host_id: String,
    /// Device classification
    pub kind: DeviceKind,
    /// Vendor firmware tag
    #[serde(default = "default_firmware")]
    pub firmware: String,
    /// Relay channel index (relays only)
    pub channel: Option<u8>,
    /// Sensor subtype (sensors only)
    pub sensor_subtype: Option<String>,
    /// Grouping label
    pub workspace: Option<String>,
}

fn default_firmware() -> String {
    "tasmota".to_string()
}

/// Device log list response.
#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub logs: Vec<DeviceLog>,
    pub count: usize,
}

/// Request body for commanding a relay.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Desired relay state
    pub state: RelayAction,
}

fn parse_device_id(raw: &str) -> HandlerResult<DeviceId> {
    DeviceId::from_string(raw)
        .map_err(|_| ApiError::BadRequest(format!("invalid device id: {raw}")))
}

/// List devices, optionally filtered by kind.
pub async fn list_devices_handler(
    State(state): State<ServerState>,
    Query(filter): Query<DeviceFilter>,
) -> HandlerResult<Json<DeviceListResponse>> {
    let devices = match filter.kind {
        Some(kind) => state.devices.list_by_kind(kind).await?,
        None => state.devices.list().await?,
    };
    let count = devices.len();
    Ok(Json(DeviceListResponse { devices, count }))
}

/// Register a new device record.
pub async fn create_device_handler(
    State(state): State<ServerState>,
    Json(req): Json<CreateDeviceRequest>,
) -> HandlerResult<(StatusCode, Json<Device>)> {
    let device = match req.kind {
        DeviceKind::Relay => {
            let channel = req
                .channel
                .ok_or_else(|| ApiError::BadRequest("relay devices require channel".to_string()))?;
            Device::relay(req.name, req.host_id, channel)
        }
        DeviceKind::Sensor => {
            let subtype = req.sensor_subtype.ok_or_else(|| {
                ApiError::BadRequest("sensor devices require sensor_subtype".to_string())
            })?;
            Device::sensor(req.name, req.host_id, subtype)
        }
    };
    let mut device = device.with_firmware(req.firmware);
    device.workspace = req.workspace;

    state.devices.insert(device.clone()).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Fetch one device.
pub async fn get_device_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> HandlerResult<Json<Device>> {
    let id = parse_device_id(&id)?;
    Ok(Json(state.devices.get(id).await?))
}

/// Delete a device and its history.
pub async fn delete_device_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> HandlerResult<StatusCode> {
    let id = parse_device_id(&id)?;
    state.devices.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a device's history, newest first.
pub async fn device_logs_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> HandlerResult<Json<LogListResponse>> {
    let id = parse_device_id(&id)?;
    // 404 for unknown devices rather than an empty list.
    state.devices.get(id).await?;
    let logs = state.logs.list_for_device(id).await?;
    let count = logs.len();
    Ok(Json(LogListResponse { logs, count }))
}

/// Send a relay command and record the commanded state.
///
/// The state is recorded optimistically; the device's own RESULT report
/// will confirm (and re-record) it through ingestion.
pub async fn send_command_handler(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> HandlerResult<Json<Device>> {
    let id = parse_device_id(&id)?;
    let device = state.devices.get(id).await?;

    let reading = state.dispatcher.send(&device, req.state).await?;
    state.devices.update_reading(id, reading, Utc::now()).await?;

    Ok(Json(state.devices.get(id).await?))
}
