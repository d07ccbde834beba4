//! Device and automation rule data model.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reading::Reading;

/// Unique identifier for a device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an automation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

impl RuleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Relay device (switchable, command-capable)
    Relay,
    /// Sensor device (reads data only)
    Sensor,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relay => write!(f, "relay"),
            Self::Sensor => write!(f, "sensor"),
        }
    }
}

/// A managed device.
///
/// Several device records may share one `host_id`: a physical host can
/// expose multiple relay channels, each mapped to its own record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Record identifier
    pub id: DeviceId,
    /// Display name
    pub name: String,
    /// Vendor-side identifier of the physical host
    pub host_id: String,
    /// Device classification
    pub kind: DeviceKind,
    /// Vendor firmware tag (e.g. "tasmota")
    pub firmware: String,
    /// Relay channel index on the host (relays only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    /// Sensor subtype (sensors only, e.g. "am2301")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_subtype: Option<String>,
    /// Last normalized reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<Reading>,
    /// When the last reading was applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Weak grouping label; the workspace does not own the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
}

impl Device {
    /// Create a relay device record.
    pub fn relay(name: impl Into<String>, host_id: impl Into<String>, channel: u8) -> Self {
        Self {
            id: DeviceId::new(),
            name: name.into(),
            host_id: host_id.into(),
            kind: DeviceKind::Relay,
            firmware: "tasmota".to_string(),
            channel: Some(channel),
            sensor_subtype: None,
            last_reading: None,
            last_updated_at: None,
            workspace: None,
        }
    }

    /// Create a sensor device record.
    pub fn sensor(
        name: impl Into<String>,
        host_id: impl Into<String>,
        subtype: impl Into<String>,
    ) -> Self {
        Self {
            id: DeviceId::new(),
            name: name.into(),
            host_id: host_id.into(),
            kind: DeviceKind::Sensor,
            firmware: "tasmota".to_string(),
            channel: None,
            sensor_subtype: Some(subtype.into()),
            last_reading: None,
            last_updated_at: None,
            workspace: None,
        }
    }

    /// Set the firmware tag.
    pub fn with_firmware(mut self, firmware: impl Into<String>) -> Self {
        self.firmware = firmware.into();
        self
    }

    /// Set the last reading and its timestamp.
    pub fn with_reading(mut self, reading: Reading, at: DateTime<Utc>) -> Self {
        self.last_reading = Some(reading);
        self.last_updated_at = Some(at);
        self
    }
}

/// An append-only device history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLog {
    /// Record identifier
    pub id: Uuid,
    /// Owning device; logs are cascade-deleted with it
    pub device_id: DeviceId,
    /// The reading that was persisted
    pub reading: Reading,
    /// Creation timestamp
    pub time: DateTime<Utc>,
}

impl DeviceLog {
    /// Create a log entry timestamped now.
    pub fn new(device_id: DeviceId, reading: Reading) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            reading,
            time: Utc::now(),
        }
    }
}

/// Automation trigger classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Fires at a time of day
    Time,
    /// Fires on a sensor reading threshold
    Sensor,
}

/// Command sent to a relay when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayAction {
    On,
    Off,
}

impl RelayAction {
    /// Wire representation ("ON"/"OFF").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Case-insensitive comparison against a recorded relay state.
    pub fn matches_state(&self, state: &str) -> bool {
        state.eq_ignore_ascii_case(self.as_str())
    }
}

impl std::fmt::Display for RelayAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold comparator for sensor rules.
///
/// All five are accepted and persisted, but only `>` and `<` are evaluated;
/// the remainder never fire (pending product clarification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "<")]
    Lt,
}

impl Comparator {
    /// Apply the comparator; inert variants always return false.
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Eq | Self::Ge | Self::Le => false,
        }
    }
}

/// A stored automation rule.
///
/// Field requirements depend on `kind` and are enforced at the API
/// boundary: time rules require `fire_time`; sensor rules require
/// `source_sensor`, `reading_field`, `comparator` and `threshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    /// Record identifier
    pub id: RuleId,
    /// Display name
    pub name: String,
    /// Relay commanded when the rule fires (non-owning reference)
    pub target_device: DeviceId,
    /// Trigger classification
    pub kind: RuleKind,
    /// Command to send on trigger
    pub action: RelayAction,
    /// Time of day, minute granularity (time rules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_time: Option<NaiveTime>,
    /// Sensor whose reading is compared (sensor rules, non-owning)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sensor: Option<DeviceId>,
    /// Reading field to compare (sensor rules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_field: Option<String>,
    /// Threshold comparator (sensor rules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<Comparator>,
    /// Threshold value (sensor rules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl AutomationRule {
    /// Create a time-of-day rule.
    pub fn time(
        name: impl Into<String>,
        target_device: DeviceId,
        fire_time: NaiveTime,
        action: RelayAction,
    ) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            target_device,
            kind: RuleKind::Time,
            action,
            fire_time: Some(fire_time),
            source_sensor: None,
            reading_field: None,
            comparator: None,
            threshold: None,
        }
    }

    /// Create a sensor threshold rule.
    pub fn sensor(
        name: impl Into<String>,
        target_device: DeviceId,
        source_sensor: DeviceId,
        reading_field: impl Into<String>,
        comparator: Comparator,
        threshold: f64,
        action: RelayAction,
    ) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            target_device,
            kind: RuleKind::Sensor,
            action,
            fire_time: None,
            source_sensor: Some(source_sensor),
            reading_field: Some(reading_field.into()),
            comparator: Some(comparator),
            threshold: Some(threshold),
        }
    }
}
