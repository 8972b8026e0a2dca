use thiserror::Error;

/// Error type for document store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store refused the write (rules, validation, quota).
    #[error("write rejected: {0}")]
    Rejected(String),
    /// The operation did not complete in time.
    #[error("store operation timed out")]
    Timeout,
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The local store handle's state is unusable.
    #[error("store storage error: {0}")]
    Storage(String),
}
