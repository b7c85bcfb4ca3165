//! Tracker host error types

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by `AppState` operations
#[derive(Error, Debug)]
pub enum HostError {
    /// Course ids must be non-empty
    #[error("Invalid course id: {0:?}")]
    InvalidCourseId(String),

    /// No mounted tracker has this id
    #[error("Tracker not found: {0}")]
    TrackerNotFound(u64),

    /// The tracker task ended without reporting back
    #[error("Tracker {0} failed: {1}")]
    TrackerFailed(u64, String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),

    /// Direct store access failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
