//! Device type resolution.
//!
//! Maps a classified message and a device record to the concrete reading
//! extractor. Sensors resolve in two explicit stages (subtype, then
//! firmware) so failures name the stage that missed; relays resolve in
//! one. New extractors register by extending these match tables, never at
//! the call sites.

use serde_json::Value;

use homelink_core::{Device, Reading};

use crate::error::{DeviceError, Result};
use crate::firmware::ResolverKind;
use crate::tasmota;

/// A concrete reading-extraction strategy for one (kind, firmware) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    TasmotaRelay,
    TasmotaAm2301,
}

impl Extractor {
    /// Convert a decoded payload body into a normalized reading.
    pub fn extract(&self, body: &Value, device: &Device) -> Result<Reading> {
        match self {
            Self::TasmotaRelay => tasmota::extract_relay(body, device),
            Self::TasmotaAm2301 => tasmota::extract_am2301(body),
        }
    }

    /// Whether the extractor's device family accepts commands.
    pub fn supports_commands(&self) -> bool {
        matches!(self, Self::TasmotaRelay)
    }

    /// Transport topic suffix for commanding this device.
    pub fn command_topic(&self, device: &Device) -> Result<String> {
        match self {
            Self::TasmotaRelay => {
                let channel =
                    device.channel.ok_or_else(|| DeviceError::NoChannelConfigured {
                        device: device.id.to_string(),
                    })?;
                Ok(tasmota::command_topic(channel))
            }
            Self::TasmotaAm2301 => Err(DeviceError::UnsupportedOperation(device.id.to_string())),
        }
    }
}

/// Resolve the extractor for a device.
pub fn resolve(kind: ResolverKind, device: &Device) -> Result<Extractor> {
    match kind {
        ResolverKind::Relay => relay_extractor(device),
        ResolverKind::Sensor => sensor_extractor(device),
    }
}

fn relay_extractor(device: &Device) -> Result<Extractor> {
    match device.firmware.as_str() {
        tasmota::FIRMWARE => Ok(Extractor::TasmotaRelay),
        other => Err(DeviceError::UnknownFirmware {
            firmware: other.to_string(),
        }),
    }
}

/// Two-stage sensor lookup: subtype first, then firmware within it.
fn sensor_extractor(device: &Device) -> Result<Extractor> {
    let subtype = device.sensor_subtype.as_deref().unwrap_or("");
    match subtype {
        "am2301" => am2301_extractor(device),
        other => Err(DeviceError::UnknownSensorSubtype {
            subtype: other.to_string(),
        }),
    }
}

fn am2301_extractor(device: &Device) -> Result<Extractor> {
    match device.firmware.as_str() {
        tasmota::FIRMWARE => Ok(Extractor::TasmotaAm2301),
        other => Err(DeviceError::UnknownFirmware {
            firmware: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_resolves_by_firmware() {
        let device = Device::relay("Test", "t1", 1);
        assert_eq!(
            resolve(ResolverKind::Relay, &device).unwrap(),
            Extractor::TasmotaRelay
        );
    }

    #[test]
    fn relay_with_unknown_firmware_fails_at_firmware_stage() {
        let device = Device::relay("Test", "t1", 1).with_firmware("espurna");
        assert!(matches!(
            resolve(ResolverKind::Relay, &device),
            Err(DeviceError::UnknownFirmware { firmware }) if firmware == "espurna"
        ));
    }

    #[test]
    fn sensor_resolves_through_subtype_then_firmware() {
        let device = Device::sensor("Test", "t1", "am2301");
        assert_eq!(
            resolve(ResolverKind::Sensor, &device).unwrap(),
            Extractor::TasmotaAm2301
        );
    }

    #[test]
    fn unknown_subtype_fails_at_subtype_stage() {
        let device = Device::sensor("Test", "t1", "unknown_x");
        assert!(matches!(
            resolve(ResolverKind::Sensor, &device),
            Err(DeviceError::UnknownSensorSubtype { subtype }) if subtype == "unknown_x"
        ));
    }

    #[test]
    fn known_subtype_with_unknown_firmware_fails_at_firmware_stage() {
        let device = Device::sensor("Test", "t1", "am2301").with_firmware("espurna");
        assert!(matches!(
            resolve(ResolverKind::Sensor, &device),
            Err(DeviceError::UnknownFirmware { firmware }) if firmware == "espurna"
        ));
    }

    #[test]
    fn sensors_do_not_support_commands() {
        let device = Device::sensor("Test", "t1", "am2301");
        let extractor = resolve(ResolverKind::Sensor, &device).unwrap();
        assert!(!extractor.supports_commands());
        assert!(matches!(
            extractor.command_topic(&device),
            Err(DeviceError::UnsupportedOperation(_))
        ));
    }
}
