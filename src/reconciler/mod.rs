//! Optimistic reconcilers.
//!
//! ```text
//!   gesture ──▶ PendingMap ──▶ visible (watch) ──▶ render
//!      │             ▲
//!      ▼             │ pending overrides
//!   KeyedLocks ──▶ store.write          subscription ──▶ pump ──▶ reconcile
//!      │
//!      ▼ ok: confirm + TimerSet settle      err: revert to baseline
//! ```

mod follows;
mod likes;
mod pending;
mod pump;
mod timers;

pub use follows::{FollowOutcome, FollowReconciler};
pub use likes::{LikeReconciler, ToggleOutcome};
pub use pending::{Pending, PendingMap};
pub use timers::TimerSet;
