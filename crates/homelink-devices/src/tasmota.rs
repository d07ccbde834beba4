//! Tasmota firmware support.
//!
//! Tasmota topics are `"<host_id>/<ACTION>"` with actions `STATE`, `SENSOR`
//! and `RESULT`. Relay state arrives as `{"POWER<channel>": "ON"|"OFF"}`;
//! AM2301 sensor telemetry as nested `{"AM2301": {"Temperature": ..,
//! "Humidity": ..}, "TempUnit": "C"}`. Only `RESULT` messages are persisted
//! to history: they acknowledge a commanded state change, while `STATE` is
//! the periodic heartbeat.

use serde_json::Value;

use homelink_core::{Device, Reading};

use crate::error::{DeviceError, Result};
use crate::firmware::{Classification, ResolverKind};
use crate::topic::parse_topic;

/// Firmware tag as stored on device records.
pub const FIRMWARE: &str = "tasmota";

/// Adapter for one inbound Tasmota message.
#[derive(Debug, Clone)]
pub struct TasmotaAdapter {
    topic: String,
    body: Value,
}

impl TasmotaAdapter {
    pub fn new(topic: String, body: Value) -> Self {
        Self { topic, body }
    }

    /// The decoded payload body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Map the topic's action segment to an extractor family.
    pub fn classify(&self) -> Result<Classification> {
        let parsed = parse_topic(&self.topic)?;
        let (resolver, persist_to_history) = match parsed.action.as_str() {
            "STATE" => (ResolverKind::Relay, false),
            "RESULT" => (ResolverKind::Relay, true),
            "SENSOR" => (ResolverKind::Sensor, false),
            _ => {
                return Err(DeviceError::UnknownAction {
                    firmware: FIRMWARE,
                    action: parsed.action,
                })
            }
        };
        Ok(Classification {
            host_id: parsed.host_id,
            resolver,
            persist_to_history,
        })
    }
}

/// Extract a relay reading from `body["POWER<channel>"]`.
pub fn extract_relay(body: &Value, device: &Device) -> Result<Reading> {
    let channel = device.channel.ok_or_else(|| DeviceError::NoChannelConfigured {
        device: device.id.to_string(),
    })?;

    let key = format!("POWER{channel}");
    let state = body
        .get(&key)
        .and_then(Value::as_str)
        .ok_or(DeviceError::MissingChannelReading { key })?;

    Ok(Reading::relay_state(state))
}

/// Extract an AM2301 reading from the nested sensor block.
pub fn extract_am2301(body: &Value) -> Result<Reading> {
    let block = body
        .get("AM2301")
        .ok_or_else(|| DeviceError::MissingSensorFields("AM2301".to_string()))?;

    let temperature = block
        .get("Temperature")
        .and_then(Value::as_f64)
        .ok_or_else(|| DeviceError::MissingSensorFields("AM2301.Temperature".to_string()))?;
    let humidity = block
        .get("Humidity")
        .and_then(Value::as_f64)
        .ok_or_else(|| DeviceError::MissingSensorFields("AM2301.Humidity".to_string()))?;
    let units = body
        .get("TempUnit")
        .and_then(Value::as_str)
        .ok_or_else(|| DeviceError::MissingSensorFields("TempUnit".to_string()))?;

    Ok(Reading::sensor(temperature, humidity, units))
}

/// Cloud-to-device topic suffix addressing one relay channel.
pub fn command_topic(channel: u8) -> String {
    format!("/power{channel}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relay_extraction_reads_channel_key() {
        let device = Device::relay("Test", "t1", 2);
        let reading = extract_relay(&json!({"POWER2": "OFF"}), &device).unwrap();
        assert_eq!(reading.state(), Some("OFF"));
    }

    #[test]
    fn relay_extraction_is_idempotent() {
        let device = Device::relay("Test", "t1", 1);
        let body = json!({"POWER1": "ON", "Dimmer": 100});
        let first = extract_relay(&body, &device).unwrap();
        let second = extract_relay(&body, &device).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn relay_extraction_requires_a_channel() {
        let mut device = Device::relay("Test", "t1", 1);
        device.channel = None;
        assert!(matches!(
            extract_relay(&json!({"POWER1": "ON"}), &device),
            Err(DeviceError::NoChannelConfigured { .. })
        ));
    }

    #[test]
    fn relay_extraction_fails_for_missing_channel_key() {
        let device = Device::relay("Test", "t1", 3);
        assert!(matches!(
            extract_relay(&json!({"POWER2": "OFF"}), &device),
            Err(DeviceError::MissingChannelReading { key }) if key == "POWER3"
        ));
    }

    #[test]
    fn am2301_extraction_yields_all_three_fields() {
        let body = json!({
            "Time": "2021-08-16T13:57:26",
            "AM2301": {"DewPoint": 0, "Humidity": 44.0, "Temperature": 28.0},
            "TempUnit": "C"
        });
        let reading = extract_am2301(&body).unwrap();
        assert_eq!(reading.number("temperature"), Some(28.0));
        assert_eq!(reading.number("humidity"), Some(44.0));
        assert_eq!(reading.get("units").and_then(|v| v.as_str()), Some("C"));
    }

    #[test]
    fn am2301_extraction_names_the_missing_field() {
        let body = json!({"AM2301": {"Temperature": 21.0}, "TempUnit": "C"});
        assert!(matches!(
            extract_am2301(&body),
            Err(DeviceError::MissingSensorFields(field)) if field == "AM2301.Humidity"
        ));
    }

    #[test]
    fn command_topic_is_channel_scoped() {
        assert_eq!(command_topic(2), "/power2");
    }
}
