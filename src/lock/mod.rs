//! Per-entity serialization of remote writes.
//!
//! Optimistic state changes apply immediately, but two writes for the same
//! entity must reach the store in gesture order. Writes for different
//! entities never wait on each other.

mod keyed;

pub use keyed::{KeyedGuard, KeyedLocks};
