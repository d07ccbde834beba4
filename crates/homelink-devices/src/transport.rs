//! Cloud-to-device command transport.
//!
//! The vendor hub accepts cloud-to-device messages over HTTPS. The
//! connection string carries the endpoint and access token:
//! `Endpoint=https://hub.example;AccessToken=<token>`.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::{DeviceError, Result};

/// Outbound transport for device commands.
///
/// Calls are synchronous network sends; timeout and retry policy belong to
/// the caller, not the transport.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Send `payload` to the device `host_id`, addressed by a
    /// firmware-specific topic suffix (e.g. `/power2`).
    async fn send(&self, host_id: &str, topic: &str, payload: &str) -> Result<()>;
}

/// Parsed hub connection string.
#[derive(Debug, Clone)]
struct HubConnection {
    endpoint: String,
    access_token: String,
}

impl HubConnection {
    fn parse(connection_string: &str) -> Option<Self> {
        let mut endpoint = None;
        let mut access_token = None;
        for part in connection_string.split(';') {
            match part.split_once('=') {
                Some(("Endpoint", v)) => endpoint = Some(v.trim_end_matches('/').to_string()),
                Some(("AccessToken", v)) => access_token = Some(v.to_string()),
                _ => {}
            }
        }
        Some(Self {
            endpoint: endpoint?,
            access_token: access_token?,
        })
    }
}

/// HTTPS transport to the vendor hub.
///
/// Constructed with or without credentials; a missing or unparseable
/// connection string surfaces as [`DeviceError::TransportUnavailable`] at
/// send time, so the interactive caller gets a useful error instead of a
/// startup failure.
pub struct HubTransport {
    connection: Option<HubConnection>,
    client: reqwest::Client,
}

impl HubTransport {
    /// Build from an optional connection string.
    pub fn new(connection_string: Option<&str>) -> Self {
        let connection = connection_string.and_then(HubConnection::parse);
        if connection.is_none() {
            tracing::warn!("hub connection string not configured, commands will fail");
        }
        Self {
            connection,
            client: reqwest::Client::new(),
        }
    }

    /// Whether credentials are configured.
    pub fn is_configured(&self) -> bool {
        self.connection.is_some()
    }
}

#[async_trait]
impl CommandTransport for HubTransport {
    async fn send(&self, host_id: &str, topic: &str, payload: &str) -> Result<()> {
        let connection = self
            .connection
            .as_ref()
            .ok_or(DeviceError::TransportUnavailable)?;

        let url = format!("{}/devices/{}/messages", connection.endpoint, host_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&connection.access_token)
            .json(&json!({
                "payload": payload,
                "properties": { "TOPIC": topic },
            }))
            .send()
            .await
            .map_err(|e| DeviceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeviceError::Transport(format!(
                "hub rejected command: {}",
                response.status()
            )));
        }

        tracing::debug!(host_id, topic, payload, "command sent to hub");
        Ok(())
    }
}

/// Transport that records sends instead of performing them. Used by tests
/// and by dry-run deployments.
#[derive(Default)]
pub struct NullTransport {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(host_id, topic, payload)` triples sent so far.
    pub async fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl CommandTransport for NullTransport {
    async fn send(&self, host_id: &str, topic: &str, payload: &str) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((host_id.to_string(), topic.to_string(), payload.to_string()));
        Ok(())
    }
}
