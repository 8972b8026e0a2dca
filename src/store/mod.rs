//! Remote document store abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              LikeReconciler / FollowReconciler               │
//! │  - write() on gestures, subscribe() for live snapshots      │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DocumentStore trait                        │
//! │  read / query / subscribe / write                            │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌─────────────────────┐          ┌──────────────────────────┐
//! │InMemoryDocumentStore│          │ Firestore / DynamoDB ... │
//! │     (included)      │          │        (external)        │
//! └─────────────────────┘          └──────────────────────────┘
//! ```

mod document;
mod error;
mod in_memory;
mod query;
#[allow(clippy::module_inception)]
mod store;
mod subscription;

pub use document::Document;
pub use error::StoreError;
pub use in_memory::{InMemoryDocumentStore, WriteRecord};
pub use query::{Direction, Filter, Order, Query};
pub use store::DocumentStore;
pub use subscription::Subscription;
