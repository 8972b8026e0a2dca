mod auth;
mod cache;
mod config;
mod dialog;
mod entity;
mod error;
mod feed;
mod lock;
mod reconciler;
mod store;
mod tracking;

pub use auth::{AuthProvider, AuthState, WatchAuth};
pub use cache::{CacheError, FileSessionCache, FollowingCache, InMemorySessionCache, SessionCache};
pub use config::{ConfigError, ReconcilerConfig};
pub use dialog::{Confirmation, DialogState};
pub use entity::{validate_id, EntityId, LikedBy, NormalizeError, Product, SellerId, UserId};
pub use error::ReconcileError;
pub use feed::{FeedSession, Notice};
pub use lock::{KeyedGuard, KeyedLocks};
pub use reconciler::{
    FollowOutcome, FollowReconciler, LikeReconciler, Pending, PendingMap, TimerSet, ToggleOutcome,
};
pub use store::{
    Direction, Document, DocumentStore, Filter, InMemoryDocumentStore, Order, Query, StoreError,
    Subscription, WriteRecord,
};
#[cfg(feature = "log-sink")]
pub use tracking::LogSink;
pub use tracking::{
    InMemorySink, Interaction, InteractionBus, InteractionKind, TrackError, TrackingSink,
};
