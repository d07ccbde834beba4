//! Store traits for devices, rules and history logs.
//!
//! The pipeline and evaluator are written against these traits so the core
//! never assumes a specific persistence engine. Implementations live in
//! `homelink-storage`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{AutomationRule, Device, DeviceId, DeviceKind, DeviceLog, RuleId, RuleKind};
use crate::reading::Reading;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend error.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Persistence for device records.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fetch a device by id.
    async fn get(&self, id: DeviceId) -> Result<Device>;

    /// List all devices.
    async fn list(&self) -> Result<Vec<Device>>;

    /// All device records sharing a vendor host id. Zero, one or many
    /// records may match (one per relay channel).
    async fn find_by_host_id(&self, host_id: &str) -> Result<Vec<Device>>;

    /// List devices of one kind.
    async fn list_by_kind(&self, kind: DeviceKind) -> Result<Vec<Device>>;

    /// Insert a new device.
    async fn insert(&self, device: Device) -> Result<()>;

    /// Upsert the last reading and its timestamp on one device row.
    async fn update_reading(
        &self,
        id: DeviceId,
        reading: Reading,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a device. History logs cascade at the storage layer.
    async fn delete(&self, id: DeviceId) -> Result<()>;
}

/// Append-only persistence for device history.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append one history record.
    async fn append(&self, log: DeviceLog) -> Result<()>;

    /// List history for a device, newest first.
    async fn list_for_device(&self, device_id: DeviceId) -> Result<Vec<DeviceLog>>;
}

/// Persistence for automation rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Fetch a rule by id.
    async fn get(&self, id: RuleId) -> Result<AutomationRule>;

    /// List all rules.
    async fn list(&self) -> Result<Vec<AutomationRule>>;

    /// List rules of one kind.
    async fn list_by_kind(&self, kind: RuleKind) -> Result<Vec<AutomationRule>>;

    /// Insert a new rule.
    async fn insert(&self, rule: AutomationRule) -> Result<()>;

    /// Replace an existing rule.
    async fn update(&self, rule: AutomationRule) -> Result<()>;

    /// Delete a rule.
    async fn delete(&self, id: RuleId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_record() {
        let err = StoreError::NotFound("device abc".to_string());
        assert!(err.to_string().contains("device abc"));
    }
}
