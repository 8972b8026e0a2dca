//! InMemoryDocumentStore - HashMap-backed realtime store for tests and local
//! development.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedSender};

use super::{Document, DocumentStore, Query, StoreError, Subscription};

/// One applied write, kept for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub collection: String,
    pub id: String,
    pub fields: Map<String, Value>,
}

struct SubscriberSlot {
    id: u64,
    collection: String,
    query: Query,
    tx: UnboundedSender<Vec<Document>>,
}

#[derive(Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, Document>>,
    subscribers: Vec<SubscriberSlot>,
    next_subscriber: u64,
    write_latency: Duration,
    injected_failures: VecDeque<StoreError>,
    writes: Vec<WriteRecord>,
}

impl State {
    fn fan_out(&mut self, collection: &str) {
        let docs = self.collections.get(collection);
        self.subscribers.retain(|slot| {
            if slot.collection != collection {
                return true;
            }
            let snapshot = match docs {
                Some(docs) => slot.query.apply(docs.values()),
                None => Vec::new(),
            };
            slot.tx.send(snapshot).is_ok()
        });
    }
}

/// In-memory document store.
///
/// Clone-friendly via `Arc`: clones share documents and subscribers.
/// Writes wait for the configured latency, then either fail (if a failure
/// was injected) or merge and fan a fresh snapshot out to every subscriber
/// of the collection.
///
/// ```
/// use feed_reconciler::{Document, DocumentStore, InMemoryDocumentStore, Query};
///
/// # tokio_test_block(async {
/// let store = InMemoryDocumentStore::new();
/// store.put("products", Document::new("p1").with_field("title", "Lamp"));
/// let docs = store.query("products", &Query::new()).await.unwrap();
/// assert_eq!(docs.len(), 1);
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))
    }

    fn state_or_recover(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace a whole document and notify subscribers, as if another
    /// client had written it.
    pub fn put(&self, collection: &str, doc: Document) {
        let mut state = self.state_or_recover();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc);
        state.fan_out(collection);
    }

    /// Insert documents without notifying subscribers.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let mut state = self.state_or_recover();
        let docs_by_id = state.collections.entry(collection.to_string()).or_default();
        for doc in docs {
            docs_by_id.insert(doc.id.clone(), doc);
        }
    }

    /// Deliver an arbitrary snapshot to every subscriber of `collection`,
    /// regardless of what the store holds. Simulates lagging replicas.
    pub fn deliver(&self, collection: &str, snapshot: Vec<Document>) {
        let mut state = self.state_or_recover();
        state.subscribers.retain(|slot| {
            slot.collection != collection || slot.tx.send(snapshot.clone()).is_ok()
        });
    }

    /// Re-deliver the current result sets (duplicate delivery).
    pub fn redeliver(&self, collection: &str) {
        self.state_or_recover().fan_out(collection);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.state_or_recover()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn set_write_latency(&self, latency: Duration) {
        self.state_or_recover().write_latency = latency;
    }

    /// The next `count` writes fail with `error`, after the write latency.
    pub fn fail_next_writes(&self, count: usize, error: StoreError) {
        let mut state = self.state_or_recover();
        for _ in 0..count {
            state.injected_failures.push_back(error.clone());
        }
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state_or_recover().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state_or_recover().writes.len()
    }

    /// Subscribers that have not unsubscribed.
    pub fn active_subscriptions(&self) -> usize {
        let mut state = self.state_or_recover();
        state.subscribers.retain(|slot| !slot.tx.is_closed());
        state.subscribers.len()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let state = self.state()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let state = self.state()?;
        Ok(match state.collections.get(collection) {
            Some(docs) => query.apply(docs.values()),
            None => Vec::new(),
        })
    }

    async fn subscribe(&self, collection: &str, query: Query) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let slot_id = {
            let mut state = self.state()?;
            let initial = match state.collections.get(collection) {
                Some(docs) => query.apply(docs.values()),
                None => Vec::new(),
            };
            // The receiver is alive, so the initial send cannot fail.
            let _ = tx.send(initial);

            let slot_id = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.push(SubscriberSlot {
                id: slot_id,
                collection: collection.to_string(),
                query,
                tx,
            });
            slot_id
        };

        let shared = Arc::clone(&self.state);
        Ok(Subscription::new(rx, move || {
            let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
            state.subscribers.retain(|slot| slot.id != slot_id);
        }))
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let latency = self.state()?.write_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state()?;
        if let Some(error) = state.injected_failures.pop_front() {
            return Err(error);
        }

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| Document::new(id))
            .merge(&fields);
        state.writes.push(WriteRecord {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        state.fan_out(collection);
        Ok(())
    }
}
