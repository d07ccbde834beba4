//! Shared handler state.

use std::sync::Arc;

use homelink_core::{DeviceStore, LogStore, RuleStore};
use homelink_devices::{CommandDispatcher, IngestPipeline};

/// State shared by all handlers. Cheap to clone; everything is an `Arc`.
#[derive(Clone)]
pub struct ServerState {
    pub devices: Arc<dyn DeviceStore>,
    pub rules: Arc<dyn RuleStore>,
    pub logs: Arc<dyn LogStore>,
    pub pipeline: Arc<IngestPipeline>,
    pub dispatcher: Arc<CommandDispatcher>,
}

impl ServerState {
    /// Wire the handler state from stores and a dispatcher. The ingestion
    /// pipeline is built here so it shares the same store handles.
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        rules: Arc<dyn RuleStore>,
        logs: Arc<dyn LogStore>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        let pipeline = Arc::new(IngestPipeline::new(devices.clone(), logs.clone()));
        Self {
            devices,
            rules,
            logs,
            pipeline,
            dispatcher,
        }
    }
}
