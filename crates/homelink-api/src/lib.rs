//! HTTP API for HomeLink.
//!
//! Exposes device management, automation rules, command dispatch and the
//! reading ingestion endpoint over axum. Handlers are thin: validation and
//! DTO mapping here, semantics in `homelink-devices` and the stores.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::create_router_with_state;
pub use state::ServerState;
