//! The gesture boundary for one feed.
//!
//! `FeedSession` owns the reconcilers and turns every gesture's outcome into
//! at most one [`Notice`]. Nothing here returns an error to the caller except
//! [`FeedSession::open`].

mod notice;

use std::sync::Arc;

use tracing::debug;

use crate::auth::AuthProvider;
use crate::cache::{FollowingCache, SessionCache};
use crate::config::ReconcilerConfig;
use crate::dialog::{Confirmation, DialogState};
use crate::entity::{EntityId, SellerId, UserId};
use crate::error::ReconcileError;
use crate::reconciler::{FollowReconciler, LikeReconciler};
use crate::store::{DocumentStore, Query};
use crate::tracking::{Interaction, InteractionBus, InteractionKind};

pub use notice::Notice;
use notice::notice_for;

pub struct FeedSession<S, A> {
    likes: LikeReconciler<S>,
    follows: FollowReconciler<S>,
    tracker: InteractionBus,
    auth: A,
    dialogs: DialogState,
}

impl<S, A> FeedSession<S, A>
where
    S: DocumentStore + Clone,
    A: AuthProvider,
{
    pub fn new(
        store: S,
        auth: A,
        tracker: InteractionBus,
        cache: Arc<dyn SessionCache>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            likes: LikeReconciler::new(store.clone(), tracker.clone(), config.clone()),
            follows: FollowReconciler::new(
                store,
                tracker.clone(),
                FollowingCache::new(cache),
                config,
            ),
            tracker,
            auth,
            dialogs: DialogState::new(),
        }
    }

    pub fn likes(&self) -> &LikeReconciler<S> {
        &self.likes
    }

    pub fn follows(&self) -> &FollowReconciler<S> {
        &self.follows
    }

    pub fn dialogs(&self) -> &DialogState {
        &self.dialogs
    }

    pub fn tracker(&self) -> &InteractionBus {
        &self.tracker
    }

    fn user(&self) -> Option<UserId> {
        self.auth.state().user_id().cloned()
    }

    /// Wait for auth, then load the feed and the user's follow state.
    pub async fn open(&self, query: Query) -> Result<(), ReconcileError> {
        self.likes.attach(&self.auth, query).await?;
        self.follows.attach(&self.auth).await
    }

    /// Toggle the current user's like on `entity_id`.
    pub async fn like(&self, entity_id: &str) -> Option<Notice> {
        let user = self.user();
        match self.likes.toggle(entity_id, user.as_ref()).await {
            Ok(_) => None,
            Err(error) => notice_for("update your like", &error),
        }
    }

    /// Unlike after the user confirms. Does nothing if the entity is not
    /// currently liked.
    pub async fn remove_like(&self, entity_id: &str) -> Option<Notice> {
        let Some(user) = self.user() else {
            return Some(Notice::LoginRequired);
        };
        let liked = self
            .likes
            .product(entity_id)
            .and_then(|product| product.liked_by)
            .is_some_and(|liked_by| liked_by.contains(&user));
        if !liked {
            return None;
        }
        let entity_id = match EntityId::new(entity_id) {
            Ok(id) => id,
            Err(error) => return notice_for("remove your like", &error),
        };

        let accepted = self
            .dialogs
            .request(Confirmation::RemoveLike {
                entity_id: entity_id.clone(),
            })
            .await;
        if !accepted {
            debug!(entity_id = %entity_id, "remove like cancelled");
            return None;
        }
        match self.likes.toggle(entity_id.as_str(), Some(&user)).await {
            Ok(_) => None,
            Err(error) => notice_for("remove your like", &error),
        }
    }

    pub async fn follow(&self, seller_id: &str) -> Option<Notice> {
        let user = self.user();
        match self.follows.follow(seller_id, user.as_ref()).await {
            Ok(_) => None,
            Err(error) => notice_for("follow", &error),
        }
    }

    /// Unfollow after the user confirms.
    pub async fn unfollow(&self, seller_id: &str) -> Option<Notice> {
        let Some(user) = self.user() else {
            return Some(Notice::LoginRequired);
        };
        let seller_id = match SellerId::new(seller_id) {
            Ok(id) => id,
            Err(error) => return notice_for("unfollow", &error),
        };
        if !self.follows.is_following(seller_id.as_str()) {
            return None;
        }

        let accepted = self
            .dialogs
            .request(Confirmation::Unfollow {
                seller_id: seller_id.clone(),
            })
            .await;
        if !accepted {
            debug!(seller_id = %seller_id, "unfollow cancelled");
            return None;
        }
        match self.follows.unfollow(seller_id.as_str(), Some(&user)).await {
            Ok(_) => None,
            Err(error) => notice_for("unfollow", &error),
        }
    }

    /// Record a share. Needs a signed-in user.
    pub fn share(&self, entity_id: &str) -> Option<Notice> {
        let Some(user) = self.user() else {
            return Some(Notice::LoginRequired);
        };
        self.track(entity_id, user, InteractionKind::Share)
    }

    /// Record a view. Anonymous views are not tracked.
    pub fn view(&self, entity_id: &str) {
        if let Some(user) = self.user() {
            self.track(entity_id, user, InteractionKind::View);
        }
    }

    fn track(&self, entity_id: &str, user: UserId, kind: InteractionKind) -> Option<Notice> {
        let result = EntityId::new(entity_id)
            .and_then(|id| self.tracker.record(&Interaction::new(&id, user, kind)));
        match result {
            Ok(()) => None,
            Err(error) => notice_for("record that", &error),
        }
    }

    /// Cancel any open dialog and tear down both reconcilers.
    pub async fn dispose(&self) {
        self.dialogs.cancel();
        self.likes.dispose().await;
        self.follows.dispose().await;
    }
}
