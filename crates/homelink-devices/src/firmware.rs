//! Firmware adapter selection.
//!
//! An adapter interprets one firmware family's payloads. Selection keys on
//! the shape of the inbound message's property bag, not its content, so
//! consumers never name a concrete adapter type. Adding a firmware means
//! adding one enum variant and one predicate arm in [`FirmwareAdapter::identify`].

use serde_json::{Map, Value};

use crate::error::{DeviceError, Result};
use crate::tasmota::TasmotaAdapter;

/// Which extractor family handles a classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    Relay,
    Sensor,
}

/// What a firmware adapter learned from an inbound message.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Vendor host id the message came from.
    pub host_id: String,
    /// Extractor family for the message's action.
    pub resolver: ResolverKind,
    /// Whether the resulting reading is appended to device history.
    pub persist_to_history: bool,
}

/// A firmware-specific payload interpreter.
#[derive(Debug, Clone)]
pub enum FirmwareAdapter {
    Tasmota(TasmotaAdapter),
}

impl FirmwareAdapter {
    /// Select an adapter from the message's property bag.
    ///
    /// A `topic` property marks the Tasmota family; anything else is an
    /// unsupported firmware.
    pub fn identify(properties: &Map<String, Value>, body: Value) -> Result<Self> {
        if let Some(topic) = properties.get("topic").and_then(Value::as_str) {
            return Ok(Self::Tasmota(TasmotaAdapter::new(topic.to_string(), body)));
        }
        Err(DeviceError::UnsupportedFirmware)
    }

    /// Classify the message into host id, extractor family and history flag.
    pub fn classify(&self) -> Result<Classification> {
        match self {
            Self::Tasmota(adapter) => adapter.classify(),
        }
    }

    /// The decoded payload body.
    pub fn body(&self) -> &Value {
        match self {
            Self::Tasmota(adapter) => adapter.body(),
        }
    }

    /// Firmware tag as stored on device records.
    pub fn firmware_tag(&self) -> &'static str {
        match self {
            Self::Tasmota(_) => crate::tasmota::FIRMWARE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn topic_property_selects_tasmota() {
        let adapter =
            FirmwareAdapter::identify(&props(&[("topic", "t1/STATE")]), json!({})).unwrap();
        assert_eq!(adapter.firmware_tag(), "tasmota");
    }

    #[test]
    fn missing_topic_is_unsupported_firmware() {
        let result = FirmwareAdapter::identify(&props(&[("other", "x")]), json!({}));
        assert!(matches!(result, Err(DeviceError::UnsupportedFirmware)));
    }

    #[test]
    fn result_action_persists_to_history() {
        let adapter =
            FirmwareAdapter::identify(&props(&[("topic", "t1/RESULT")]), json!({})).unwrap();
        let classification = adapter.classify().unwrap();
        assert_eq!(classification.host_id, "t1");
        assert_eq!(classification.resolver, ResolverKind::Relay);
        assert!(classification.persist_to_history);
    }

    #[test]
    fn state_and_sensor_actions_do_not_persist() {
        for (action, resolver) in [("STATE", ResolverKind::Relay), ("SENSOR", ResolverKind::Sensor)]
        {
            let adapter = FirmwareAdapter::identify(
                &props(&[("topic", &format!("t1/{action}"))]),
                json!({}),
            )
            .unwrap();
            let classification = adapter.classify().unwrap();
            assert_eq!(classification.resolver, resolver);
            assert!(!classification.persist_to_history);
        }
    }

    #[test]
    fn unknown_action_fails_classification() {
        let adapter =
            FirmwareAdapter::identify(&props(&[("topic", "t1/INFO1")]), json!({})).unwrap();
        assert!(matches!(
            adapter.classify(),
            Err(DeviceError::UnknownAction { action, .. }) if action == "INFO1"
        ));
    }
}
