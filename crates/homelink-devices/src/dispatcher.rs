//! Command dispatch.
//!
//! Translates a logical `(device, action)` pair into a vendor transport
//! call. Both the interactive command endpoint and the rule evaluator go
//! through this one path, so failures carry the same taxonomy regardless
//! of trigger source.

use std::sync::Arc;

use homelink_core::{Device, DeviceKind, Reading, RelayAction};

use crate::error::{DeviceError, Result};
use crate::firmware::ResolverKind;
use crate::resolver::resolve;
use crate::transport::CommandTransport;

/// Sends relay commands through the vendor transport.
pub struct CommandDispatcher {
    transport: Arc<dyn CommandTransport>,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self { transport }
    }

    /// Send `action` to `device`.
    ///
    /// Returns the reading the device is expected to report back once the
    /// command is applied.
    pub async fn send(&self, device: &Device, action: RelayAction) -> Result<Reading> {
        if device.kind != DeviceKind::Relay {
            return Err(DeviceError::NotARelay(device.id.to_string()));
        }

        let extractor = resolve(ResolverKind::Relay, device)?;
        if !extractor.supports_commands() {
            return Err(DeviceError::UnsupportedOperation(device.id.to_string()));
        }

        let topic = extractor.command_topic(device)?;
        self.transport
            .send(&device.host_id, &topic, action.as_str())
            .await?;

        tracing::info!(
            device_id = %device.id,
            host_id = %device.host_id,
            action = %action,
            "relay command dispatched"
        );
        Ok(Reading::relay_state(action.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NullTransport;

    #[tokio::test]
    async fn dispatch_addresses_the_channel_topic() {
        let transport = Arc::new(NullTransport::new());
        let dispatcher = CommandDispatcher::new(transport.clone());
        let device = Device::relay("Test", "wemos-t1", 2);

        let reading = dispatcher.send(&device, RelayAction::Off).await.unwrap();
        assert_eq!(reading.state(), Some("OFF"));

        let sent = transport.sent().await;
        assert_eq!(sent, vec![("wemos-t1".into(), "/power2".into(), "OFF".into())]);
    }

    #[tokio::test]
    async fn sensors_are_rejected_before_the_transport() {
        let transport = Arc::new(NullTransport::new());
        let dispatcher = CommandDispatcher::new(transport.clone());
        let device = Device::sensor("Test", "wemos-t1", "am2301");

        let result = dispatcher.send(&device, RelayAction::On).await;
        assert!(matches!(result, Err(DeviceError::NotARelay(_))));
        assert!(transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn relay_without_channel_fails_channel_read() {
        let transport = Arc::new(NullTransport::new());
        let dispatcher = CommandDispatcher::new(transport);
        let mut device = Device::relay("Test", "t1", 1);
        device.channel = None;

        let result = dispatcher.send(&device, RelayAction::On).await;
        assert!(matches!(result, Err(DeviceError::NoChannelConfigured { .. })));
    }

    #[tokio::test]
    async fn unknown_firmware_fails_resolution() {
        let transport = Arc::new(NullTransport::new());
        let dispatcher = CommandDispatcher::new(transport);
        let device = Device::relay("Test", "t1", 1).with_firmware("espurna");

        let result = dispatcher.send(&device, RelayAction::On).await;
        assert!(matches!(result, Err(DeviceError::UnknownFirmware { .. })));
    }
}
