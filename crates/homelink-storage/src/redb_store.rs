//! Persistent stores on redb.
//!
//! A single unified table holds all records under namespaced keys:
//! `devices:{id}`, `rules:{id}` and `logs:{device_id}:{millis}:{log_id}`.
//! Values are JSON-serialized records. Log keys are prefixed by the owning
//! device id so history scans by prefix and cascade-deletes with the
//! device.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, TableDefinition};

use homelink_core::store::Result;
use homelink_core::{
    AutomationRule, Device, DeviceId, DeviceKind, DeviceLog, DeviceStore, LogStore, Reading,
    RuleId, RuleKind, RuleStore, StoreError,
};

const UNIFIED_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("homelink");

const DEVICES: &str = "devices";
const RULES: &str = "rules";
const LOGS: &str = "logs";

/// Namespaced key for the unified table.
fn make_key(namespace: &str, key: &str) -> String {
    let mut result = String::with_capacity(namespace.len() + key.len() + 1);
    result.push_str(namespace);
    result.push(':');
    result.push_str(key);
    result
}

/// Log key ordered by device, then time. Millis are zero-padded so the
/// lexicographic order matches chronological order within one device.
fn log_key(device_id: DeviceId, time: DateTime<Utc>, log_id: uuid::Uuid) -> String {
    format!("{device_id}:{:013}:{log_id}", time.timestamp_millis())
}

fn backend_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// redb-backed implementation of all three store traits.
pub struct RedbStores {
    db: Arc<Database>,
}

impl RedbStores {
    /// Open or create the database at `path`, creating parent directories
    /// and the unified table as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = if path.exists() {
            Database::open(path).map_err(backend_err)?
        } else {
            Database::create(path).map_err(backend_err)?
        };

        // Open the table once so later read transactions always find it.
        let txn = db.begin_write().map_err(backend_err)?;
        txn.open_table(UNIFIED_TABLE).map_err(backend_err)?;
        txn.commit().map_err(backend_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let namespaced = make_key(namespace, key);
        let txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = txn.open_table(UNIFIED_TABLE).map_err(backend_err)?;
            table.insert(&*namespaced, value).map_err(backend_err)?;
        }
        txn.commit().map_err(backend_err)?;
        Ok(())
    }

    fn fetch(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let namespaced = make_key(namespace, key);
        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(UNIFIED_TABLE).map_err(backend_err)?;
        Ok(table
            .get(&*namespaced)
            .map_err(backend_err)?
            .map(|v| v.value().to_vec()))
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<bool> {
        let namespaced = make_key(namespace, key);
        let txn = self.db.begin_write().map_err(backend_err)?;
        let removed = {
            let mut table = txn.open_table(UNIFIED_TABLE).map_err(backend_err)?;
            let removed = table.remove(&*namespaced).map_err(backend_err)?.is_some();
            removed
        };
        txn.commit().map_err(backend_err)?;
        Ok(removed)
    }

    fn scan(&self, namespace: &str, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let full_prefix = make_key(namespace, prefix);
        let strip = namespace.len() + 1;

        let txn = self.db.begin_read().map_err(backend_err)?;
        let table = txn.open_table(UNIFIED_TABLE).map_err(backend_err)?;

        // Keys sort lexicographically, so everything under the prefix is
        // contiguous: seek to it and stop at the first key past it.
        let mut results = Vec::new();
        for item in table.range(full_prefix.as_str()..).map_err(backend_err)? {
            let (key, value) = item.map_err(backend_err)?;
            let key_str = key.value();
            if !key_str.starts_with(&full_prefix) {
                break;
            }
            if let Some(rest) = key_str.get(strip..) {
                results.push((rest.to_string(), value.value().to_vec()));
            }
        }
        Ok(results)
    }

    fn remove_prefix(&self, namespace: &str, prefix: &str) -> Result<()> {
        let keys: Vec<String> = self
            .scan(namespace, prefix)?
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        let txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = txn.open_table(UNIFIED_TABLE).map_err(backend_err)?;
            for key in keys {
                let namespaced = make_key(namespace, &key);
                table.remove(&*namespaced).map_err(backend_err)?;
            }
        }
        txn.commit().map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for RedbStores {
    async fn get(&self, id: DeviceId) -> Result<Device> {
        let bytes = self
            .fetch(DEVICES, &id.to_string())?
            .ok_or_else(|| StoreError::NotFound(format!("device {id}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list(&self) -> Result<Vec<Device>> {
        self.scan(DEVICES, "")?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(Into::into))
            .collect()
    }

    async fn find_by_host_id(&self, host_id: &str) -> Result<Vec<Device>> {
        let all = DeviceStore::list(self).await?;
        Ok(all.into_iter().filter(|d| d.host_id == host_id).collect())
    }

    async fn list_by_kind(&self, kind: DeviceKind) -> Result<Vec<Device>> {
        let all = DeviceStore::list(self).await?;
        Ok(all.into_iter().filter(|d| d.kind == kind).collect())
    }

    async fn insert(&self, device: Device) -> Result<()> {
        let bytes = serde_json::to_vec(&device)?;
        self.put(DEVICES, &device.id.to_string(), &bytes)
    }

    async fn update_reading(
        &self,
        id: DeviceId,
        reading: Reading,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut device = DeviceStore::get(self, id).await?;
        device.last_reading = Some(reading);
        device.last_updated_at = Some(at);
        let bytes = serde_json::to_vec(&device)?;
        self.put(DEVICES, &id.to_string(), &bytes)
    }

    async fn delete(&self, id: DeviceId) -> Result<()> {
        if !self.remove(DEVICES, &id.to_string())? {
            return Err(StoreError::NotFound(format!("device {id}")));
        }
        self.remove_prefix(LOGS, &format!("{id}:"))?;
        Ok(())
    }
}

#[async_trait]
impl LogStore for RedbStores {
    async fn append(&self, log: DeviceLog) -> Result<()> {
        let key = log_key(log.device_id, log.time, log.id);
        let bytes = serde_json::to_vec(&log)?;
        self.put(LOGS, &key, &bytes)
    }

    async fn list_for_device(&self, device_id: DeviceId) -> Result<Vec<DeviceLog>> {
        let mut logs: Vec<DeviceLog> = self
            .scan(LOGS, &format!("{device_id}:"))?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect::<Result<_>>()?;
        logs.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(logs)
    }
}

#[async_trait]
impl RuleStore for RedbStores {
    async fn get(&self, id: RuleId) -> Result<AutomationRule> {
        let bytes = self
            .fetch(RULES, &id.to_string())?
            .ok_or_else(|| StoreError::NotFound(format!("rule {id}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list(&self) -> Result<Vec<AutomationRule>> {
        self.scan(RULES, "")?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(Into::into))
            .collect()
    }

    async fn list_by_kind(&self, kind: RuleKind) -> Result<Vec<AutomationRule>> {
        let all = RuleStore::list(self).await?;
        Ok(all.into_iter().filter(|r| r.kind == kind).collect())
    }

    async fn insert(&self, rule: AutomationRule) -> Result<()> {
        let bytes = serde_json::to_vec(&rule)?;
        self.put(RULES, &rule.id.to_string(), &bytes)
    }

    async fn update(&self, rule: AutomationRule) -> Result<()> {
        if self.fetch(RULES, &rule.id.to_string())?.is_none() {
            return Err(StoreError::NotFound(format!("rule {}", rule.id)));
        }
        let bytes = serde_json::to_vec(&rule)?;
        self.put(RULES, &rule.id.to_string(), &bytes)
    }

    async fn delete(&self, id: RuleId) -> Result<()> {
        if !self.remove(RULES, &id.to_string())? {
            return Err(StoreError::NotFound(format!("rule {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RedbStores) {
        let dir = tempfile::tempdir().unwrap();
        let stores = RedbStores::open(dir.path().join("test.redb")).unwrap();
        (dir, stores)
    }

    #[tokio::test]
    async fn device_round_trip() {
        let (_dir, stores) = open_temp();
        let device = Device::relay("Test", "t1", 2);
        let id = device.id;
        DeviceStore::insert(&stores, device).await.unwrap();

        let fetched = DeviceStore::get(&stores, id).await.unwrap();
        assert_eq!(fetched.host_id, "t1");
        assert_eq!(fetched.channel, Some(2));
    }

    #[tokio::test]
    async fn reading_update_persists() {
        let (_dir, stores) = open_temp();
        let device = Device::sensor("S", "t1", "am2301");
        let id = device.id;
        DeviceStore::insert(&stores, device).await.unwrap();

        stores
            .update_reading(id, Reading::sensor(25.0, 40.0, "C"), Utc::now())
            .await
            .unwrap();
        let fetched = DeviceStore::get(&stores, id).await.unwrap();
        assert_eq!(fetched.last_reading.unwrap().number("temperature"), Some(25.0));
    }

    #[tokio::test]
    async fn logs_scan_by_device_and_cascade_on_delete() {
        let (_dir, stores) = open_temp();
        let a = Device::relay("A", "t1", 1);
        let b = Device::relay("B", "t1", 2);
        let (id_a, id_b) = (a.id, b.id);
        DeviceStore::insert(&stores, a).await.unwrap();
        DeviceStore::insert(&stores, b).await.unwrap();

        stores
            .append(DeviceLog::new(id_a, Reading::relay_state("ON")))
            .await
            .unwrap();
        stores
            .append(DeviceLog::new(id_a, Reading::relay_state("OFF")))
            .await
            .unwrap();
        stores
            .append(DeviceLog::new(id_b, Reading::relay_state("ON")))
            .await
            .unwrap();

        assert_eq!(stores.list_for_device(id_a).await.unwrap().len(), 2);
        assert_eq!(stores.list_for_device(id_b).await.unwrap().len(), 1);

        DeviceStore::delete(&stores, id_a).await.unwrap();
        assert!(stores.list_for_device(id_a).await.unwrap().is_empty());
        assert_eq!(stores.list_for_device(id_b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listings_stay_inside_their_namespace() {
        let (_dir, stores) = open_temp();

        // Populate all three namespaces; "logs:" sorts between "devices:"
        // and "rules:" in the unified table.
        let device = Device::relay("A", "t1", 1);
        let device_id = device.id;
        DeviceStore::insert(&stores, device).await.unwrap();
        stores
            .append(DeviceLog::new(device_id, Reading::relay_state("ON")))
            .await
            .unwrap();
        let rule = AutomationRule::time(
            "Evening",
            device_id,
            chrono::NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            homelink_core::RelayAction::On,
        );
        RuleStore::insert(&stores, rule).await.unwrap();

        assert_eq!(DeviceStore::list(&stores).await.unwrap().len(), 1);
        assert_eq!(RuleStore::list(&stores).await.unwrap().len(), 1);
        assert_eq!(stores.list_for_device(device_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_device_is_not_found() {
        let (_dir, stores) = open_temp();
        let result = DeviceStore::get(&stores, DeviceId::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn rule_round_trip_preserves_comparator() {
        let (_dir, stores) = open_temp();
        let rule = AutomationRule::sensor(
            "Hot",
            DeviceId::new(),
            DeviceId::new(),
            "temperature",
            homelink_core::Comparator::Gt,
            24.0,
            homelink_core::RelayAction::On,
        );
        let id = rule.id;
        RuleStore::insert(&stores, rule).await.unwrap();

        let fetched = RuleStore::get(&stores, id).await.unwrap();
        assert_eq!(fetched.comparator, Some(homelink_core::Comparator::Gt));
        assert_eq!(fetched.threshold, Some(24.0));
    }
}
