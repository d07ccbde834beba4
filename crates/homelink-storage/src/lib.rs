//! Store implementations for HomeLink.
//!
//! Two backends implement the `homelink-core` store traits:
//!
//! - [`MemoryStores`] — HashMap-backed, for tests and ephemeral runs
//! - [`RedbStores`] — redb-backed persistent storage

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStores;
pub use redb_store::RedbStores;
