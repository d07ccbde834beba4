//! Batch ingestion pipeline.
//!
//! Processes an ordered batch of inbound hub envelopes. Each envelope is
//! decoded (base64 body, JSON), classified by firmware adapter, fanned out
//! to every device record sharing the classified host id, extracted, and
//! applied as the device's last reading. `RESULT` readings additionally
//! append a history log per updated device.
//!
//! The contract is best-effort: one malformed message never aborts the
//! batch. Only a non-list top-level payload is fatal.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use homelink_core::{Device, DeviceLog, DeviceStore, LogStore};

use crate::error::{DeviceError, Result};
use crate::firmware::{Classification, FirmwareAdapter};
use crate::resolver::resolve;

/// One recorded per-item failure.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    /// Position of the envelope in the batch.
    pub index: usize,
    /// Device record the failure applies to, when it is per-device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Failure description.
    pub error: String,
}

/// Summary of one batch ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Envelopes attempted.
    pub attempted: usize,
    /// Device rows whose reading was updated.
    pub updated: usize,
    /// History log entries appended.
    pub logged: usize,
    /// Per-item failures, in encounter order.
    pub failures: Vec<ItemFailure>,
}

/// Orchestrates decode, classification, extraction and persistence for
/// inbound message batches.
pub struct IngestPipeline {
    devices: Arc<dyn DeviceStore>,
    logs: Arc<dyn LogStore>,
}

impl IngestPipeline {
    pub fn new(devices: Arc<dyn DeviceStore>, logs: Arc<dyn LogStore>) -> Self {
        Self { devices, logs }
    }

    /// Ingest a batch of envelopes.
    ///
    /// Fails only when the top-level payload is not a list; every other
    /// failure is recorded in the report and processing continues in input
    /// order.
    pub async fn ingest_batch(&self, payload: Value) -> Result<BatchReport> {
        let envelopes = match payload {
            Value::Array(items) => items,
            _ => return Err(DeviceError::InvalidBatchShape),
        };

        let mut report = BatchReport::default();
        for (index, envelope) in envelopes.into_iter().enumerate() {
            report.attempted += 1;
            if let Err(error) = self.ingest_one(index, &envelope, &mut report).await {
                warn!(index, %error, "skipping undeliverable envelope");
                report.failures.push(ItemFailure {
                    index,
                    device_id: None,
                    error: error.to_string(),
                });
            }
        }
        Ok(report)
    }

    /// Process one envelope; per-device failures are recorded in `report`
    /// while envelope-level failures propagate to the caller's catch.
    async fn ingest_one(
        &self,
        index: usize,
        envelope: &Value,
        report: &mut BatchReport,
    ) -> Result<()> {
        let (body, properties) = decode_envelope(envelope)?;
        let adapter = FirmwareAdapter::identify(&properties, body)?;
        let classification = adapter.classify()?;

        let matches = self.devices.find_by_host_id(&classification.host_id).await?;
        if matches.is_empty() {
            warn!(host_id = %classification.host_id, "no device records for host");
        }

        for device in matches {
            if let Err(error) = self.apply_to_device(&adapter, &classification, &device).await {
                warn!(
                    index,
                    device_id = %device.id,
                    host_id = %device.host_id,
                    %error,
                    "skipping device for envelope"
                );
                report.failures.push(ItemFailure {
                    index,
                    device_id: Some(device.id.to_string()),
                    error: error.to_string(),
                });
            } else {
                report.updated += 1;
                if classification.persist_to_history {
                    report.logged += 1;
                }
            }
        }
        Ok(())
    }

    async fn apply_to_device(
        &self,
        adapter: &FirmwareAdapter,
        classification: &Classification,
        device: &Device,
    ) -> Result<()> {
        let extractor = resolve(classification.resolver, device)?;
        let reading = extractor.extract(adapter.body(), device)?;

        self.devices
            .update_reading(device.id, reading.clone(), Utc::now())
            .await?;

        if classification.persist_to_history {
            self.logs.append(DeviceLog::new(device.id, reading)).await?;
        }
        Ok(())
    }
}

/// Pull `data.body` (base64 → UTF-8 → JSON) and `data.properties` out of
/// one envelope.
fn decode_envelope(envelope: &Value) -> Result<(Value, serde_json::Map<String, Value>)> {
    let data = envelope
        .get("data")
        .ok_or_else(|| DeviceError::BadEnvelope("missing \"data\"".to_string()))?;

    let body_b64 = data
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| DeviceError::BadEnvelope("missing \"data.body\"".to_string()))?;
    let properties = data
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| DeviceError::BadEnvelope("missing \"data.properties\"".to_string()))?
        .clone();

    // The hub encodes bodies with URL-safe base64.
    let raw = URL_SAFE
        .decode(body_b64)
        .map_err(|e| DeviceError::BodyDecode(e.to_string()))?;
    let text = String::from_utf8(raw).map_err(|e| DeviceError::BodyDecode(e.to_string()))?;
    let body: Value =
        serde_json::from_str(&text).map_err(|e| DeviceError::BodyParse(e.to_string()))?;

    Ok((body, properties))
}
