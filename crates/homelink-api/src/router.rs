//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{basic, devices, ingest, rules};
use crate::state::ServerState;

/// Create the application router with a specific state.
pub fn create_router_with_state(state: ServerState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(basic::health_handler))
        // Reading ingestion
        .route("/api/ingest/readings", post(ingest::ingest_readings_handler))
        // Devices
        .route(
            "/api/devices",
            get(devices::list_devices_handler).post(devices::create_device_handler),
        )
        .route(
            "/api/devices/:id",
            get(devices::get_device_handler).delete(devices::delete_device_handler),
        )
        .route("/api/devices/:id/logs", get(devices::device_logs_handler))
        .route("/api/devices/:id/command", post(devices::send_command_handler))
        // Rules
        .route(
            "/api/rules",
            get(rules::list_rules_handler).post(rules::create_rule_handler),
        )
        .route(
            "/api/rules/:id",
            get(rules::get_rule_handler)
                .put(rules::update_rule_handler)
                .delete(rules::delete_rule_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
