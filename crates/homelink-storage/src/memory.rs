//! In-memory store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use homelink_core::store::Result;
use homelink_core::{
    AutomationRule, Device, DeviceId, DeviceKind, DeviceLog, DeviceStore, LogStore, Reading,
    RuleId, RuleKind, RuleStore, StoreError,
};

/// HashMap-backed implementation of all three store traits.
///
/// One instance implements devices, logs and rules together so cascade
/// deletes stay inside the type.
#[derive(Default)]
pub struct MemoryStores {
    devices: RwLock<HashMap<DeviceId, Device>>,
    logs: RwLock<Vec<DeviceLog>>,
    rules: RwLock<HashMap<RuleId, AutomationRule>>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryStores {
    async fn get(&self, id: DeviceId) -> Result<Device> {
        self.devices
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("device {id}")))
    }

    async fn list(&self) -> Result<Vec<Device>> {
        Ok(self.devices.read().await.values().cloned().collect())
    }

    async fn find_by_host_id(&self, host_id: &str) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.host_id == host_id)
            .cloned()
            .collect())
    }

    async fn list_by_kind(&self, kind: DeviceKind) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect())
    }

    async fn insert(&self, device: Device) -> Result<()> {
        self.devices.write().await.insert(device.id, device);
        Ok(())
    }

    async fn update_reading(
        &self,
        id: DeviceId,
        reading: Reading,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("device {id}")))?;
        device.last_reading = Some(reading);
        device.last_updated_at = Some(at);
        Ok(())
    }

    async fn delete(&self, id: DeviceId) -> Result<()> {
        let removed = self.devices.write().await.remove(&id);
        if removed.is_none() {
            return Err(StoreError::NotFound(format!("device {id}")));
        }
        // History is owned by the device, so it goes with it.
        self.logs.write().await.retain(|log| log.device_id != id);
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemoryStores {
    async fn append(&self, log: DeviceLog) -> Result<()> {
        self.logs.write().await.push(log);
        Ok(())
    }

    async fn list_for_device(&self, device_id: DeviceId) -> Result<Vec<DeviceLog>> {
        let mut logs: Vec<DeviceLog> = self
            .logs
            .read()
            .await
            .iter()
            .filter(|log| log.device_id == device_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(logs)
    }
}

#[async_trait]
impl RuleStore for MemoryStores {
    async fn get(&self, id: RuleId) -> Result<AutomationRule> {
        self.rules
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("rule {id}")))
    }

    async fn list(&self) -> Result<Vec<AutomationRule>> {
        Ok(self.rules.read().await.values().cloned().collect())
    }

    async fn list_by_kind(&self, kind: RuleKind) -> Result<Vec<AutomationRule>> {
        Ok(self
            .rules
            .read()
            .await
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn insert(&self, rule: AutomationRule) -> Result<()> {
        self.rules.write().await.insert(rule.id, rule);
        Ok(())
    }

    async fn update(&self, rule: AutomationRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        if !rules.contains_key(&rule.id) {
            return Err(StoreError::NotFound(format!("rule {}", rule.id)));
        }
        rules.insert(rule.id, rule);
        Ok(())
    }

    async fn delete(&self, id: RuleId) -> Result<()> {
        self.rules
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("rule {id}")))
    }
}
