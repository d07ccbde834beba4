//! Device and firmware abstraction for HomeLink.
//!
//! Translates inbound vendor telemetry into normalized device readings and
//! routes outbound commands back through the vendor transport:
//!
//! - [`topic`] — vendor topic string parsing
//! - [`firmware`] — payload-shape to firmware adapter selection
//! - [`resolver`] — (kind, subtype, firmware) to reading extractor
//! - [`tasmota`] — the Tasmota firmware adapter and extractors
//! - [`transport`] / [`dispatcher`] — cloud-to-device command path
//! - [`pipeline`] — batch ingestion of inbound messages

pub mod dispatcher;
pub mod error;
pub mod firmware;
pub mod pipeline;
pub mod resolver;
pub mod tasmota;
pub mod topic;
pub mod transport;

pub use dispatcher::CommandDispatcher;
pub use error::DeviceError;
pub use firmware::{Classification, FirmwareAdapter, ResolverKind};
pub use pipeline::{BatchReport, IngestPipeline, ItemFailure};
pub use resolver::{resolve, Extractor};
pub use topic::{parse_topic, ParsedTopic};
pub use transport::{CommandTransport, HubTransport, NullTransport};
