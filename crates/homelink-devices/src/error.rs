//! Device-layer error types.

use homelink_core::StoreError;

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Device error types.
///
/// The ingestion pipeline treats everything except [`InvalidBatchShape`]
/// as a per-item failure: logged, recorded, and skipped.
///
/// [`InvalidBatchShape`]: DeviceError::InvalidBatchShape
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Topic string has no host/action separator.
    #[error("malformed topic: {0:?}")]
    MalformedTopic(String),

    /// No firmware adapter matches the payload's property shape.
    #[error("firmware not found for payload properties")]
    UnsupportedFirmware,

    /// The topic's action segment is not known to the firmware.
    #[error("unknown action {action:?} for firmware {firmware}")]
    UnknownAction { firmware: &'static str, action: String },

    /// Relay resolution failed: no extractor for the device firmware.
    #[error("no extractor for firmware {firmware:?}")]
    UnknownFirmware { firmware: String },

    /// Sensor resolution failed at the subtype stage.
    #[error("no extractor for sensor subtype {subtype:?}")]
    UnknownSensorSubtype { subtype: String },

    /// Relay device has no channel assigned.
    #[error("device {device} has no relay channel configured")]
    NoChannelConfigured { device: String },

    /// Payload body lacks the channel's power key.
    #[error("channel reading {key:?} missing from payload body")]
    MissingChannelReading { key: String },

    /// Payload body lacks an expected sensor field.
    #[error("sensor field missing from payload body: {0}")]
    MissingSensorFields(String),

    /// Command sent to a device that cannot receive one.
    #[error("cannot send a command to a read-only sensor ({0})")]
    UnsupportedOperation(String),

    /// Command target is not a relay.
    #[error("device {0} is not a relay")]
    NotARelay(String),

    /// Transport credentials are not configured.
    #[error("hub connection string not configured")]
    TransportUnavailable,

    /// Transport call failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Envelope lacks the expected data/body/properties keys.
    #[error("malformed envelope: {0}")]
    BadEnvelope(String),

    /// Body is not valid base64 / UTF-8.
    #[error("failed to decode message body: {0}")]
    BodyDecode(String),

    /// Decoded body is not valid JSON.
    #[error("failed to parse message body as JSON: {0}")]
    BodyParse(String),

    /// Top-level batch payload is not a list. Fatal for the request.
    #[error("batch payload must be a list of envelopes")]
    InvalidBatchShape,

    /// Store failure while applying a reading.
    #[error(transparent)]
    Store(#[from] StoreError),
}
