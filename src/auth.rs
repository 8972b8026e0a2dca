//! Authentication provider seam.
//!
//! The reconcilers only need a stable user id and to know when the provider
//! has finished loading; no read is issued before that.

use std::future::Future;

use tokio::sync::watch;

use crate::entity::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// The provider has not resolved the session yet.
    #[default]
    Loading,
    SignedOut,
    SignedIn(UserId),
}

impl AuthState {
    pub fn is_ready(&self) -> bool {
        !matches!(self, AuthState::Loading)
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

pub trait AuthProvider: Send + Sync + 'static {
    /// Current state, without waiting.
    fn state(&self) -> AuthState;

    /// Resolves with the first state that is not `Loading`.
    fn ready(&self) -> impl Future<Output = AuthState> + Send;
}

/// Auth provider backed by a tokio `watch` channel.
///
/// Clone-friendly: every clone observes and drives the same state.
#[derive(Clone)]
pub struct WatchAuth {
    tx: watch::Sender<AuthState>,
}

impl Default for WatchAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchAuth {
    /// Starts in `Loading`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::Loading);
        Self { tx }
    }

    pub fn signed_in(user: UserId) -> Self {
        let auth = Self::new();
        auth.sign_in(user);
        auth
    }

    pub fn signed_out() -> Self {
        let auth = Self::new();
        auth.sign_out();
        auth
    }

    pub fn sign_in(&self, user: UserId) {
        self.tx.send_replace(AuthState::SignedIn(user));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(AuthState::SignedOut);
    }
}

impl AuthProvider for WatchAuth {
    fn state(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    async fn ready(&self) -> AuthState {
        let mut rx = self.tx.subscribe();
        let state = match rx.wait_for(AuthState::is_ready).await {
            Ok(state) => state.clone(),
            // Unreachable while `self` holds the sender.
            Err(_) => AuthState::SignedOut,
        };
        state
    }
}
