//! Core error types

use thiserror::Error;

use rtcshield_privacy::GlobalPolicy;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] rtcshield_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] rtcshield_tabs::TabError),

    #[error("Synchronization error: {0}")]
    Sync(#[from] SyncError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Context tracker stopped")]
    TrackerStopped,
}

/// Failures of a single reconciliation attempt.
///
/// None of them is fatal; the next trigger retries.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store unavailable: {0}")]
    Store(#[from] rtcshield_storage::StorageError),

    #[error("Enforcement rejected {policy}: {reason}")]
    EnforcementRejected { policy: GlobalPolicy, reason: String },
}
