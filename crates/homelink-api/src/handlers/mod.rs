//! API handlers organized by domain.

pub mod basic;
pub mod devices;
pub mod ingest;
pub mod rules;

pub use crate::state::ServerState;
