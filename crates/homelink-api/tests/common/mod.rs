//! Common test utilities for API handler tests.

use std::sync::Arc;

use homelink_api::ServerState;
use homelink_devices::{CommandDispatcher, NullTransport};
use homelink_storage::MemoryStores;

/// In-memory server state with a recording transport.
pub fn create_test_server_state() -> (ServerState, Arc<NullTransport>) {
    let stores = Arc::new(MemoryStores::new());
    let transport = Arc::new(NullTransport::new());
    let dispatcher = Arc::new(CommandDispatcher::new(transport.clone()));
    let state = ServerState::new(stores.clone(), stores.clone(), stores, dispatcher);
    (state, transport)
}
