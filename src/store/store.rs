//! DocumentStore - the realtime document store the reconcilers talk to.

use std::future::Future;

use serde_json::{Map, Value};

use super::{Document, Query, StoreError, Subscription};

/// Abstract realtime document store.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`); the reconcilers
///   call them from spawned tasks.
/// - `subscribe` must deliver the current result set immediately and then a
///   full result set on every matching change. No diff semantics and no
///   ordering guarantee relative to writes are assumed by callers.
/// - `write` is a shallow merge (upsert) of `fields` into the document.
pub trait DocumentStore: Send + Sync + 'static {
    /// Point read. `Ok(None)` when the document does not exist.
    fn read(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// One-shot filtered, ordered, limited query.
    fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    /// Open a live query.
    fn subscribe(
        &self,
        collection: &str,
        query: Query,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;

    /// Merge `fields` into `collection/id`.
    fn write(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
