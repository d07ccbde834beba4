//! Rule evaluation sweeps.
//!
//! Three independent batch jobs share this evaluator: a per-minute sweep of
//! time rules, a five-minute sweep of sensor rules, and an hourly snapshot
//! of sensor readings into history. No "rule fired" record is persisted;
//! idempotence relies entirely on comparing the target relay's recorded
//! state against the rule's action, so a sweep killed mid-way is safe to
//! rerun.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use homelink_core::store::Result;
use homelink_core::{
    AutomationRule, Device, DeviceId, DeviceKind, DeviceLog, DeviceStore, LogStore, RelayAction,
    RuleId, RuleKind, RuleStore,
};
use homelink_devices::CommandDispatcher;

/// One successfully dispatched rule firing.
#[derive(Debug, Clone, Serialize)]
pub struct FiredRule {
    pub rule_id: RuleId,
    pub device_id: DeviceId,
    pub action: RelayAction,
}

/// Evaluates stored automation rules against current device state.
pub struct RuleEvaluator {
    devices: Arc<dyn DeviceStore>,
    rules: Arc<dyn RuleStore>,
    logs: Arc<dyn LogStore>,
    dispatcher: Arc<CommandDispatcher>,
}

impl RuleEvaluator {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        rules: Arc<dyn RuleStore>,
        logs: Arc<dyn LogStore>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        Self {
            devices,
            rules,
            logs,
            dispatcher,
        }
    }

    /// Sweep time rules against `now`, minute granularity.
    ///
    /// Returns the rules that actually dispatched. A rule whose target is
    /// already in the desired state is skipped; a failed dispatch is
    /// logged and left unfired so the next sweep retries.
    pub async fn run_time_rules(&self, now: DateTime<Utc>) -> Result<Vec<FiredRule>> {
        let mut fired = Vec::new();
        for rule in self.rules.list_by_kind(RuleKind::Time).await? {
            let Some(fire_time) = rule.fire_time else {
                warn!(rule_id = %rule.id, "time rule without fire_time, skipping");
                continue;
            };
            if fire_time.hour() != now.hour() || fire_time.minute() != now.minute() {
                continue;
            }
            if let Some(result) = self.fire(&rule).await {
                fired.push(result);
            }
        }
        Ok(fired)
    }

    /// Sweep sensor threshold rules.
    ///
    /// A sensor without the compared reading field is skipped silently;
    /// malformed rules and unresolvable device references are skipped with
    /// a warning. Only `>` and `<` comparators can fire.
    pub async fn run_sensor_rules(&self) -> Result<Vec<FiredRule>> {
        let mut fired = Vec::new();
        for rule in self.rules.list_by_kind(RuleKind::Sensor).await? {
            let (Some(sensor_id), Some(field), Some(comparator), Some(threshold)) = (
                rule.source_sensor,
                rule.reading_field.as_deref(),
                rule.comparator,
                rule.threshold,
            ) else {
                warn!(rule_id = %rule.id, "sensor rule with missing fields, skipping");
                continue;
            };

            let sensor = match self.devices.get(sensor_id).await {
                Ok(sensor) => sensor,
                Err(error) => {
                    warn!(rule_id = %rule.id, %sensor_id, %error, "source sensor unresolvable");
                    continue;
                }
            };

            let Some(value) = sensor.last_reading.as_ref().and_then(|r| r.number(field)) else {
                debug!(rule_id = %rule.id, field, "reading field absent, skipping");
                continue;
            };

            if !comparator.compare(value, threshold) {
                continue;
            }
            if let Some(result) = self.fire(&rule).await {
                fired.push(result);
            }
        }
        Ok(fired)
    }

    /// Snapshot every sensor's last reading into history.
    ///
    /// Sensors without a reading are skipped. Returns the number of log
    /// entries appended.
    pub async fn snapshot_sensors(&self) -> Result<usize> {
        let mut appended = 0;
        for sensor in self.devices.list_by_kind(DeviceKind::Sensor).await? {
            let Some(reading) = sensor.last_reading.clone() else {
                continue;
            };
            self.logs.append(DeviceLog::new(sensor.id, reading)).await?;
            appended += 1;
        }
        Ok(appended)
    }

    /// Dispatch one eligible rule, applying the idempotence guard.
    ///
    /// Returns `None` when the guard holds the fire back, the target is
    /// unresolvable, or dispatch fails.
    async fn fire(&self, rule: &AutomationRule) -> Option<FiredRule> {
        let target = match self.devices.get(rule.target_device).await {
            Ok(target) => target,
            Err(error) => {
                warn!(rule_id = %rule.id, target = %rule.target_device, %error, "target device unresolvable");
                return None;
            }
        };

        if already_in_state(&target, rule.action) {
            debug!(rule_id = %rule.id, action = %rule.action, "target already in desired state");
            return None;
        }

        match self.dispatcher.send(&target, rule.action).await {
            Ok(_) => {
                debug!(rule_id = %rule.id, device_id = %target.id, action = %rule.action, "rule fired");
                Some(FiredRule {
                    rule_id: rule.id,
                    device_id: target.id,
                    action: rule.action,
                })
            }
            Err(error) => {
                // Not marked fired; the next sweep retries.
                warn!(rule_id = %rule.id, device_id = %target.id, %error, "rule dispatch failed");
                None
            }
        }
    }
}

/// The idempotence guard: true when the recorded state already equals the
/// requested action (case-insensitive). No recorded state means not in
/// state.
fn already_in_state(device: &Device, action: RelayAction) -> bool {
    device
        .last_reading
        .as_ref()
        .and_then(|reading| reading.state())
        .is_some_and(|state| action.matches_state(state))
}
