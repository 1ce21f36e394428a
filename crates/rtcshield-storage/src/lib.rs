//! RTC Shield Storage Layer
//!
//! Persists settings, site rules and bookkeeping metadata, and broadcasts
//! a change notification after every write. Readers never observe a
//! missing settings record: defaults are returned until one is written.

mod backend;
mod database;
mod error;
mod migrations;
mod state;
mod store;

pub use backend::{Backend, MemoryBackend};
pub use database::Database;
pub use error::StorageError;
pub use state::{AppState, Meta, StoreChange};
pub use store::{MemoryPolicyStore, PolicyStore, SqlitePolicyStore, StateStore};

pub type Result<T> = std::result::Result<T, StorageError>;
