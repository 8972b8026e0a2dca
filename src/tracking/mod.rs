//! Interaction tracking - one event bus, pluggable sinks.
//!
//! The reconcilers emit exactly one [`Interaction`] per gesture into an
//! [`InteractionBus`]. Every registered [`TrackingSink`] receives it. Sinks
//! are added and removed independently, so the reconcilers never know which
//! downstream ranking or analytics systems exist.
//!
//! ```
//! use std::sync::Arc;
//! use feed_reconciler::{InMemorySink, Interaction, InteractionBus, InteractionKind};
//! use feed_reconciler::{EntityId, UserId};
//!
//! let bus = InteractionBus::new();
//! let sink = Arc::new(InMemorySink::new("ranking"));
//! bus.add_sink(sink.clone());
//!
//! let interaction = Interaction::new(
//!     EntityId::new("p1").unwrap(),
//!     UserId::new("u1").unwrap(),
//!     InteractionKind::Like,
//! );
//! bus.record(&interaction).unwrap();
//! assert_eq!(sink.kinds(), vec![InteractionKind::Like]);
//! ```

mod bus;
mod in_memory;
#[cfg(feature = "log-sink")]
mod log_sink;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::UserId;

pub use bus::InteractionBus;
pub use in_memory::InMemorySink;
#[cfg(feature = "log-sink")]
pub use log_sink::LogSink;

/// What the user did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Like,
    Unlike,
    Share,
    Comment,
    Follow,
    Unfollow,
}

/// One tracked interaction.
///
/// `entity_id` is the product for likes/views/shares and the seller for
/// follows, kept as a plain string because both id kinds flow through here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub entity_id: String,
    pub user_id: UserId,
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn new(entity_id: impl AsRef<str>, user_id: UserId, kind: InteractionKind) -> Self {
        Self {
            entity_id: entity_id.as_ref().to_string(),
            user_id,
            kind,
        }
    }
}

/// Error type for tracking sinks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("interaction rejected: {0}")]
    Rejected(String),
    #[error("sink buffer poisoned")]
    BufferPoisoned,
}

/// A downstream consumer of interactions.
///
/// Implementations might include ranking signal collectors, legacy
/// analytics endpoints, or a recommendation feature store. Calls must not
/// block for long; anything slow belongs behind the sink's own queue.
pub trait TrackingSink: Send + Sync {
    /// Stable name, used for removal and in logs.
    fn name(&self) -> &str;

    fn record(&self, interaction: &Interaction) -> Result<(), TrackError>;
}
