use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by like/follow gestures.
///
/// None of these are fatal. The worst outcome of any of them is a stale
/// like count or follow button until the next successful snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// No signed-in user. Surfaced as a login prompt, never retried.
    #[error("no authenticated user")]
    Unauthenticated,

    /// Empty, malformed, or unknown entity id. Logged only.
    #[error("invalid entity id {0:?}")]
    InvalidEntityId(String),

    /// The store rejected or timed out the write. Optimistic state was reverted.
    #[error("write failed for {id}: {source}")]
    WriteFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    /// The initial query or live subscription could not be opened.
    #[error("could not load {collection}: {source}")]
    ReadFailed {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// A tracking sink failed. Best effort only, never shown to the user.
    #[error("tracking failed: {0}")]
    TrackingFailed(String),

    /// The reconciler was disposed while the gesture was pending.
    #[error("reconciler disposed")]
    Disposed,
}

impl ReconcileError {
    /// Whether the error should reach the user as a transient notification.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            ReconcileError::Unauthenticated | ReconcileError::WriteFailed { .. }
        )
    }
}
