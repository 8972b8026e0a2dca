//! Optimistic follow/unfollow reconciliation for the signed-in user.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::pending::PendingMap;
use super::pump::{self, ApplySnapshot, PumpSlot};
use super::timers::TimerSet;
use crate::auth::{AuthProvider, AuthState};
use crate::cache::FollowingCache;
use crate::config::ReconcilerConfig;
use crate::entity::{normalize, SellerId, UserId};
use crate::error::ReconcileError;
use crate::lock::KeyedLocks;
use crate::store::{Document, DocumentStore, Filter, Query};
use crate::tracking::{Interaction, InteractionBus, InteractionKind};

const FOLLOWING_FIELD: &str = "following";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowOutcome {
    pub seller_id: SellerId,
    /// Membership after the gesture.
    pub following: bool,
    /// False when membership already matched and nothing was written.
    pub changed: bool,
}

struct FollowState {
    user: Option<UserId>,
    following: BTreeSet<SellerId>,
    pending: PendingMap<SellerId, bool>,
}

/// A following set that was just shown, still to be mirrored into the
/// session cache.
struct Published {
    user: Option<UserId>,
    following: Arc<BTreeSet<SellerId>>,
}

struct FollowInner<S> {
    store: S,
    tracker: InteractionBus,
    cache: FollowingCache,
    config: ReconcilerConfig,
    state: Mutex<FollowState>,
    following_tx: watch::Sender<Arc<BTreeSet<SellerId>>>,
    write_locks: KeyedLocks,
    timers: TimerSet,
    pump: PumpSlot,
    disposed: AtomicBool,
}

/// Follow state for the current user, kept in step with the user's document.
///
/// Same pending/settle model as [`super::LikeReconciler`], keyed by seller.
/// Every visible change is mirrored into the session cache so a reload shows
/// the right buttons before the subscription delivers.
pub struct FollowReconciler<S> {
    inner: Arc<FollowInner<S>>,
}

impl<S> Clone for FollowReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentStore> FollowReconciler<S> {
    pub fn new(
        store: S,
        tracker: InteractionBus,
        cache: FollowingCache,
        config: ReconcilerConfig,
    ) -> Self {
        let (following_tx, _) = watch::channel(Arc::new(BTreeSet::new()));
        Self {
            inner: Arc::new(FollowInner {
                store,
                tracker,
                cache,
                config,
                state: Mutex::new(FollowState {
                    user: None,
                    following: BTreeSet::new(),
                    pending: PendingMap::new(),
                }),
                following_tx,
                write_locks: KeyedLocks::new(),
                timers: TimerSet::new(),
                pump: PumpSlot::default(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn following(&self) -> Arc<BTreeSet<SellerId>> {
        self.inner.following_tx.borrow().clone()
    }

    pub fn is_following(&self, seller_id: &str) -> bool {
        self.following().iter().any(|s| s.as_str() == seller_id)
    }

    pub fn watch(&self) -> watch::Receiver<Arc<BTreeSet<SellerId>>> {
        self.inner.following_tx.subscribe()
    }

    pub fn user(&self) -> Option<UserId> {
        self.inner.lock_state().user.clone()
    }

    pub fn is_pending(&self, seller_id: &str) -> bool {
        self.inner.lock_state().pending.contains(seller_id)
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

    /// Show `user`'s cached following set immediately. Pending state from a
    /// previous user is discarded.
    pub fn restore(&self, user: &UserId) {
        self.inner.ensure_user(user);
    }

    /// Follow the user's own document once auth has resolved.
    ///
    /// Signed out: clears the visible set and stops any previous
    /// subscription, returning `Ok`.
    pub async fn attach<A: AuthProvider>(&self, auth: &A) -> Result<(), ReconcileError> {
        let user = match auth.ready().await {
            AuthState::SignedIn(user) => user,
            _ => {
                self.ensure_live()?;
                pump::stop_pump(self.inner.pump.take()).await;
                self.inner.sign_out();
                debug!("follow reconciler idle: no signed-in user");
                return Ok(());
            }
        };
        self.ensure_live()?;
        if self.user().as_ref() != Some(&user) {
            self.restore(&user);
        }

        let collection = self.inner.config.users_collection.clone();
        let subscription = self
            .inner
            .store
            .subscribe(
                &collection,
                Query::new().filter(Filter::eq("id", user.as_str())),
            )
            .await
            .map_err(|source| ReconcileError::ReadFailed {
                collection: collection.clone(),
                source,
            })?;
        let handle = pump::spawn_pump(Arc::downgrade(&self.inner), subscription, "follows");
        pump::stop_pump(self.inner.pump.replace(handle)).await;

        if self.is_disposed() {
            pump::stop_pump(self.inner.pump.take()).await;
            return Err(ReconcileError::Disposed);
        }
        info!(user_id = %user, "follow reconciler attached");
        Ok(())
    }

    /// Follow `seller_id`. A no-op (no write, no tracking) when already
    /// following.
    pub async fn follow(
        &self,
        seller_id: &str,
        user_id: Option<&UserId>,
    ) -> Result<FollowOutcome, ReconcileError> {
        self.set_following(seller_id, user_id, true).await
    }

    /// Unfollow `seller_id`. A no-op when not following.
    pub async fn unfollow(
        &self,
        seller_id: &str,
        user_id: Option<&UserId>,
    ) -> Result<FollowOutcome, ReconcileError> {
        self.set_following(seller_id, user_id, false).await
    }

    /// Merge snapshots of the users collection. Only the current user's
    /// document is considered; pending sellers keep their local membership.
    pub fn reconcile(&self, snapshot: Vec<Document>) {
        self.inner.reconcile(snapshot);
    }

    pub async fn dispose(&self) {
        let first = !self.inner.disposed.swap(true, Ordering::AcqRel);
        self.inner.timers.close();
        self.inner.lock_state().pending.clear();
        pump::stop_pump(self.inner.pump.take()).await;
        if first {
            info!("follow reconciler disposed");
        }
    }

    async fn set_following(
        &self,
        seller_id: &str,
        user_id: Option<&UserId>,
        follow: bool,
    ) -> Result<FollowOutcome, ReconcileError> {
        self.ensure_live()?;
        let Some(user) = user_id else {
            debug!(seller_id, "follow gesture without a signed-in user");
            return Err(ReconcileError::Unauthenticated);
        };
        let seller = match SellerId::new(seller_id) {
            Ok(seller) => seller,
            Err(error) => {
                warn!(%error, "rejected follow gesture");
                return Err(error);
            }
        };

        let Some(generation) = self.inner.begin_change(user, &seller, follow) else {
            debug!(
                seller_id = %seller,
                follow,
                "membership already matches; nothing to write"
            );
            return Ok(FollowOutcome {
                seller_id: seller,
                following: follow,
                changed: false,
            });
        };

        // The whole list is written, so read it only once earlier writes
        // for this user have finished.
        let written = {
            let _turn = self.inner.write_locks.acquire(user.as_str()).await;
            let fields = self.inner.following_fields();
            let written = self
                .inner
                .store
                .write(&self.inner.config.users_collection, user.as_str(), fields)
                .await;
            // The next writer must see the reverted set.
            match &written {
                Ok(()) => self.inner.confirm(&seller, follow),
                Err(_) => self.inner.revert(&seller, generation),
            }
            written
        };

        match written {
            Ok(()) => {
                let kind = if follow {
                    InteractionKind::Follow
                } else {
                    InteractionKind::Unfollow
                };
                if let Err(error) = self
                    .inner
                    .tracker
                    .record(&Interaction::new(&seller, user.clone(), kind))
                {
                    debug!(%error, "follow tracking skipped");
                }
                self.settle_later(seller.clone(), generation);
                Ok(FollowOutcome {
                    seller_id: seller,
                    following: follow,
                    changed: true,
                })
            }
            Err(source) => {
                warn!(
                    seller_id = %seller,
                    %source,
                    "follow write failed; optimistic state reverted"
                );
                Err(ReconcileError::WriteFailed {
                    id: seller.to_string(),
                    source,
                })
            }
        }
    }

    fn settle_later(&self, seller: SellerId, generation: u64) {
        let inner = Arc::downgrade(&self.inner);
        let delay = self.inner.config.follow_settle_delay();
        let scheduled = self.inner.timers.schedule(delay, move || {
            if let Some(inner) = inner.upgrade() {
                inner.settle(&seller, generation);
            }
        });
        if !scheduled {
            debug!("disposed before the settle window opened");
        }
    }
}

impl<S> FollowInner<S> {
    fn lock_state(&self) -> MutexGuard<'_, FollowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send the visible set to watchers. The returned value is mirrored
    /// into the session cache by [`FollowInner::persist`] once the state
    /// lock is released.
    fn publish(&self, state: &FollowState) -> Published {
        let following = Arc::new(state.following.clone());
        self.following_tx.send_replace(Arc::clone(&following));
        Published {
            user: state.user.clone(),
            following,
        }
    }

    fn persist(&self, published: Published) {
        let Some(user) = published.user else {
            return;
        };
        // A newer publish will persist itself.
        let latest = self.following_tx.borrow().clone();
        if Arc::ptr_eq(&latest, &published.following) {
            self.cache.save(&user, &published.following);
        }
    }

    /// Make `user` current, showing their cached following set. Pending
    /// state from a previous user is discarded.
    fn ensure_user(&self, user: &UserId) {
        if self.lock_state().user.as_ref() == Some(user) {
            return;
        }
        let cached = self.cache.load(user);

        let mut state = self.lock_state();
        if state.user.as_ref() == Some(user) {
            return;
        }
        state.pending.clear();
        state.following = cached;
        state.user = Some(user.clone());
        debug!(
            user_id = %user,
            restored = state.following.len(),
            "following set restored from cache"
        );
        self.following_tx.send_replace(Arc::new(state.following.clone()));
    }

    fn sign_out(&self) {
        let mut state = self.lock_state();
        state.user = None;
        state.pending.clear();
        state.following.clear();
        self.following_tx.send_replace(Arc::new(BTreeSet::new()));
    }

    fn begin_change(&self, user: &UserId, seller: &SellerId, follow: bool) -> Option<u64> {
        self.ensure_user(user);

        let (generation, published) = {
            let mut state = self.lock_state();
            let current = state.following.contains(seller);
            if current == follow {
                return None;
            }
            let generation = state.pending.assert_local(seller.clone(), follow, current);
            if follow {
                state.following.insert(seller.clone());
            } else {
                state.following.remove(seller);
            }
            (generation, self.publish(&state))
        };
        self.persist(published);
        debug!(seller_id = %seller, follow, generation, "optimistic follow applied");
        Some(generation)
    }

    fn following_fields(&self) -> Map<String, Value> {
        let state = self.lock_state();
        let list = state
            .following
            .iter()
            .map(|seller| Value::String(seller.to_string()))
            .collect();
        let mut fields = Map::new();
        fields.insert(FOLLOWING_FIELD.to_string(), Value::Array(list));
        fields
    }

    fn confirm(&self, seller: &SellerId, written: bool) {
        self.lock_state().pending.confirm(seller, written);
    }

    fn settle(&self, seller: &SellerId, generation: u64) {
        if self.lock_state().pending.settle(seller, generation) {
            debug!(seller_id = %seller, generation, "follow settled");
        }
    }

    fn revert(&self, seller: &SellerId, generation: u64) {
        let published = {
            let mut state = self.lock_state();
            let Some(baseline) = state.pending.fail(seller, generation) else {
                return;
            };
            if baseline {
                state.following.insert(seller.clone());
            } else {
                state.following.remove(seller);
            }
            self.publish(&state)
        };
        self.persist(published);
    }

    fn reconcile(&self, snapshot: Vec<Document>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let published = {
            let mut state = self.lock_state();
            let Some(user) = state.user.clone() else {
                return;
            };
            let Some(doc) = snapshot.iter().find(|doc| doc.id == user.as_str()) else {
                return;
            };

            let mut next: BTreeSet<SellerId> = match normalize::following(doc) {
                Some(remote) => remote.into_iter().collect(),
                None => state.following.clone(),
            };
            for (seller, &follow) in state.pending.iter() {
                if follow {
                    next.insert(seller.clone());
                } else {
                    next.remove(seller);
                }
            }

            if next == state.following {
                return;
            }
            state.following = next;
            self.publish(&state)
        };
        self.persist(published);
    }
}

impl<S: DocumentStore> ApplySnapshot for FollowInner<S> {
    fn apply_snapshot(&self, snapshot: Vec<Document>) {
        self.reconcile(snapshot);
    }
}
