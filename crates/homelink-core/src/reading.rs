//! Normalized device readings.
//!
//! Different device kinds report different field sets, so a reading is a
//! semi-structured key/value map rather than a fixed schema. Relays report
//! `{"state": "ON"}`, AM2301 sensors `{"temperature": .., "humidity": ..,
//! "units": ..}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized snapshot of a device's last known state or measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reading(pub Map<String, Value>);

impl Reading {
    /// Create an empty reading.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Reading for a relay state ("ON"/"OFF").
    pub fn relay_state(state: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("state".to_string(), Value::String(state.into()));
        Self(map)
    }

    /// Reading for a temperature/humidity sensor.
    pub fn sensor(temperature: f64, humidity: f64, units: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("temperature".to_string(), json_number(temperature));
        map.insert("humidity".to_string(), json_number(humidity));
        map.insert("units".to_string(), Value::String(units.into()));
        Self(map)
    }

    /// Get a raw field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Get a field as a number.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    /// The relay state field, if present.
    pub fn state(&self) -> Option<&str> {
        self.0.get("state").and_then(Value::as_str)
    }

    /// Insert a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Reading {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_number(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_state_round_trips() {
        let reading = Reading::relay_state("ON");
        assert_eq!(reading.state(), Some("ON"));

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json, serde_json::json!({"state": "ON"}));
    }

    #[test]
    fn sensor_fields_accessible_as_numbers() {
        let reading = Reading::sensor(21.2, 44.4, "C");
        assert_eq!(reading.number("temperature"), Some(21.2));
        assert_eq!(reading.number("humidity"), Some(44.4));
        assert_eq!(reading.get("units").and_then(|v| v.as_str()), Some("C"));
        assert_eq!(reading.number("units"), None);
    }

    #[test]
    fn missing_field_is_none() {
        let reading = Reading::relay_state("OFF");
        assert_eq!(reading.number("temperature"), None);
    }
}
