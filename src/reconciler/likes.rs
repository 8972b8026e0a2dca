//! Optimistic like/unlike reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::pending::PendingMap;
use super::pump::{self, ApplySnapshot, PumpSlot};
use super::timers::TimerSet;
use crate::auth::AuthProvider;
use crate::config::ReconcilerConfig;
use crate::entity::{EntityId, LikedBy, Product, UserId};
use crate::error::ReconcileError;
use crate::lock::KeyedLocks;
use crate::store::{Document, DocumentStore, Query};
use crate::tracking::{Interaction, InteractionBus, InteractionKind};

/// Result of a successful like/unlike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub entity_id: EntityId,
    /// Whether the user likes the entity after the gesture.
    pub liked: bool,
    pub like_count: u64,
}

/// What the store last confirmed for a product's likes.
#[derive(Debug, Clone, PartialEq)]
struct LikeBaseline {
    liked_by: Option<LikedBy>,
    stored_like_count: u64,
}

impl LikeBaseline {
    fn of(product: &Product) -> Self {
        Self {
            liked_by: product.liked_by.clone(),
            stored_like_count: product.stored_like_count,
        }
    }

    fn confirmed(liked_by: LikedBy) -> Self {
        Self {
            stored_like_count: liked_by.len() as u64,
            liked_by: Some(liked_by),
        }
    }
}

struct LikeState {
    visible: Vec<Product>,
    pending: PendingMap<EntityId, LikedBy, LikeBaseline>,
}

struct LikeInner<S> {
    store: S,
    tracker: InteractionBus,
    config: ReconcilerConfig,
    state: Mutex<LikeState>,
    visible_tx: watch::Sender<Arc<Vec<Product>>>,
    write_locks: KeyedLocks,
    timers: TimerSet,
    pump: PumpSlot,
    disposed: AtomicBool,
}

/// Keeps a product feed's like state consistent with a realtime store
/// while like/unlike writes are in flight.
///
/// Per product the state moves `Settled → Pending → SettlingGrace →
/// Settled`, or `Pending → Settled(baseline)` when the write fails. While an
/// entry is pending (including the settle window after its write lands),
/// incoming snapshots cannot overwrite its like set.
///
/// Clone-friendly: clones share state. One instance per logical feed.
pub struct LikeReconciler<S> {
    inner: Arc<LikeInner<S>>,
}

impl<S> Clone for LikeReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentStore> LikeReconciler<S> {
    pub fn new(store: S, tracker: InteractionBus, config: ReconcilerConfig) -> Self {
        let (visible_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(LikeInner {
                store,
                tracker,
                config,
                state: Mutex::new(LikeState {
                    visible: Vec::new(),
                    pending: PendingMap::new(),
                }),
                visible_tx,
                write_locks: KeyedLocks::new(),
                timers: TimerSet::new(),
                pump: PumpSlot::default(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// The products as they should be rendered right now.
    pub fn visible(&self) -> Arc<Vec<Product>> {
        self.inner.visible_tx.borrow().clone()
    }

    /// Change notifications for the visible list. Each change is one re-render.
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<Product>>> {
        self.inner.visible_tx.subscribe()
    }

    pub fn product(&self, entity_id: &str) -> Option<Product> {
        self.visible()
            .iter()
            .find(|p| p.id.as_str() == entity_id)
            .cloned()
    }

    pub fn is_pending(&self, entity_id: &str) -> bool {
        self.inner.lock_state().pending.contains(entity_id)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    pub fn outstanding_timers(&self) -> usize {
        self.inner.timers.outstanding()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.pump.is_running()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<(), ReconcileError> {
        if self.is_disposed() {
            Err(ReconcileError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Load the feed and keep it live.
    ///
    /// Waits for the auth provider to finish loading before the first read.
    /// Runs `query` once for the initial render, then subscribes and merges
    /// every delivered snapshot through [`LikeReconciler::reconcile`].
    /// Attaching again replaces the previous subscription.
    pub async fn attach<A: AuthProvider>(
        &self,
        auth: &A,
        query: Query,
    ) -> Result<(), ReconcileError> {
        let auth_state = auth.ready().await;
        self.ensure_live()?;

        let collection = self.inner.config.products_collection.clone();
        let query = match query.limit {
            Some(_) => query,
            None => query.limit(self.inner.config.feed_limit),
        };
        let read_failed = |source| ReconcileError::ReadFailed {
            collection: collection.clone(),
            source,
        };

        let initial = self
            .inner
            .store
            .query(&collection, &query)
            .await
            .map_err(read_failed)?;
        self.reconcile(initial);

        let subscription = self
            .inner
            .store
            .subscribe(&collection, query)
            .await
            .map_err(read_failed)?;
        let handle = pump::spawn_pump(Arc::downgrade(&self.inner), subscription, "likes");
        pump::stop_pump(self.inner.pump.replace(handle)).await;

        if self.is_disposed() {
            pump::stop_pump(self.inner.pump.take()).await;
            return Err(ReconcileError::Disposed);
        }
        info!(
            collection = %collection,
            signed_in = auth_state.user_id().is_some(),
            "like reconciler attached"
        );
        Ok(())
    }

    /// Like or unlike `entity_id` on behalf of `user_id`.
    ///
    /// The visible list changes before the first suspension point. The
    /// returned future resolves once the store has accepted or rejected the
    /// write; on rejection the optimistic change has already been reverted.
    pub async fn toggle(
        &self,
        entity_id: &str,
        user_id: Option<&UserId>,
    ) -> Result<ToggleOutcome, ReconcileError> {
        self.ensure_live()?;
        let Some(user) = user_id else {
            debug!(entity_id, "like gesture without a signed-in user");
            return Err(ReconcileError::Unauthenticated);
        };
        let id = match EntityId::new(entity_id) {
            Ok(id) => id,
            Err(error) => {
                warn!(%error, "rejected like gesture");
                return Err(error);
            }
        };

        let (next, generation) = self.inner.begin_toggle(&id, user)?;
        let liked = next.contains(user);
        debug!(
            entity_id = %id,
            user_id = %user,
            liked,
            generation,
            "optimistic like applied"
        );

        let written = {
            let _turn = self.inner.write_locks.acquire(id.as_str()).await;
            let written = self
                .inner
                .store
                .write(
                    &self.inner.config.products_collection,
                    id.as_str(),
                    Product::like_fields(&next),
                )
                .await;
            // Pending bookkeeping lands before the next writer for this id.
            match &written {
                Ok(()) => self.inner.confirm(&id, next.clone()),
                Err(_) => self.inner.revert(&id, generation),
            }
            written
        };

        match written {
            Ok(()) => {
                let kind = if liked {
                    InteractionKind::Like
                } else {
                    InteractionKind::Unlike
                };
                if let Err(error) = self
                    .inner
                    .tracker
                    .record(&Interaction::new(&id, user.clone(), kind))
                {
                    debug!(%error, "like tracking skipped");
                }
                self.settle_later(id.clone(), generation);
                Ok(ToggleOutcome {
                    entity_id: id,
                    liked,
                    like_count: next.len() as u64,
                })
            }
            Err(source) => {
                warn!(
                    entity_id = %id,
                    %source,
                    "like write failed; optimistic state reverted"
                );
                Err(ReconcileError::WriteFailed {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Merge a full snapshot from the store into the visible list.
    ///
    /// Pending entries keep their local like set. Other products adopt the
    /// snapshot, except that a document missing its like set keeps the one
    /// previously shown. Safe to call repeatedly with the same snapshot.
    pub fn reconcile(&self, snapshot: Vec<Document>) {
        self.inner.reconcile(snapshot);
    }

    /// Tear down: cancel settle timers, stop the subscription, drop pending
    /// state. Later gestures fail with [`ReconcileError::Disposed`].
    pub async fn dispose(&self) {
        let first = !self.inner.disposed.swap(true, Ordering::AcqRel);
        self.inner.timers.close();
        self.inner.lock_state().pending.clear();
        pump::stop_pump(self.inner.pump.take()).await;
        if first {
            info!("like reconciler disposed");
        }
    }

    fn settle_later(&self, id: EntityId, generation: u64) {
        let inner = Arc::downgrade(&self.inner);
        let delay = self.inner.config.settle_delay();
        let scheduled = self.inner.timers.schedule(delay, move || {
            if let Some(inner) = inner.upgrade() {
                inner.settle(&id, generation);
            }
        });
        if !scheduled {
            debug!("disposed before the settle window opened");
        }
    }
}

impl<S> LikeInner<S> {
    fn lock_state(&self) -> MutexGuard<'_, LikeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &LikeState) {
        self.visible_tx.send_replace(Arc::new(state.visible.clone()));
    }

    fn begin_toggle(
        &self,
        id: &EntityId,
        user: &UserId,
    ) -> Result<(LikedBy, u64), ReconcileError> {
        let mut state = self.lock_state();
        let Some(index) = state.visible.iter().position(|p| &p.id == id) else {
            warn!(entity_id = %id, "like gesture for a product that is not loaded");
            return Err(ReconcileError::InvalidEntityId(id.to_string()));
        };

        let product = &state.visible[index];
        let baseline = LikeBaseline::of(product);
        let current = match state.pending.get(id) {
            Some(local) => local.clone(),
            None => product.liked_by_or_empty(),
        };
        let next = current.toggled(user);

        let generation = state.pending.assert_local(id.clone(), next.clone(), baseline);
        state.visible[index].set_liked_by(next.clone());
        self.publish(&state);
        Ok((next, generation))
    }

    /// The store now holds `written`, whichever gesture owns the entry.
    fn confirm(&self, id: &EntityId, written: LikedBy) {
        self.lock_state()
            .pending
            .confirm(id, LikeBaseline::confirmed(written));
    }

    fn settle(&self, id: &EntityId, generation: u64) {
        if self.lock_state().pending.settle(id, generation) {
            debug!(entity_id = %id, generation, "like settled; snapshots trusted again");
        }
    }

    fn revert(&self, id: &EntityId, generation: u64) {
        let mut state = self.lock_state();
        let Some(baseline) = state.pending.fail(id, generation) else {
            debug!(
                entity_id = %id,
                generation,
                "newer gesture owns the pending like; not reverting"
            );
            return;
        };
        if let Some(product) = state.visible.iter_mut().find(|p| &p.id == id) {
            product.liked_by = baseline.liked_by;
            product.stored_like_count = baseline.stored_like_count;
        }
        self.publish(&state);
    }

    fn reconcile(&self, snapshot: Vec<Document>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.lock_state();
        let mut merged: Vec<Product> = Vec::with_capacity(snapshot.len());

        for doc in &snapshot {
            let mut product = match Product::from_document(doc) {
                Ok(product) => product,
                Err(error) => {
                    warn!(%error, "skipping product document with an invalid id");
                    continue;
                }
            };
            if merged.iter().any(|p| p.id == product.id) {
                continue;
            }

            if let Some(local) = state.pending.get(&product.id) {
                product.liked_by = Some(local.clone());
            } else if product.liked_by.is_none() {
                product.liked_by = state
                    .visible
                    .iter()
                    .find(|p| p.id == product.id)
                    .and_then(|p| p.liked_by.clone());
            }
            merged.push(product);
        }

        if merged != state.visible {
            state.visible = merged;
            self.publish(&state);
        }
    }
}

impl<S: DocumentStore> ApplySnapshot for LikeInner<S> {
    fn apply_snapshot(&self, snapshot: Vec<Document>) {
        self.reconcile(snapshot);
    }
}
