//! Confirmation dialogs for destructive gestures.
//!
//! At most one dialog is open at a time. Opening a new one cancels the
//! previous request, as does dropping every handle to the state.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::entity::{EntityId, SellerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Unfollow { seller_id: SellerId },
    RemoveLike { entity_id: EntityId },
}

struct OpenDialog {
    confirmation: Confirmation,
    responder: oneshot::Sender<bool>,
}

/// Clone-friendly: clones share the open dialog.
#[derive(Clone)]
pub struct DialogState {
    open: Arc<Mutex<Option<OpenDialog>>>,
    changes: watch::Sender<Option<Confirmation>>,
}

impl Default for DialogState {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogState {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            open: Arc::new(Mutex::new(None)),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenDialog>> {
        self.open.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open `confirmation` and resolve with the user's answer.
    ///
    /// The dialog is open as soon as this returns, before the future is
    /// polled. Resolves `false` when cancelled or superseded.
    pub fn request(
        &self,
        confirmation: Confirmation,
    ) -> impl Future<Output = bool> + Send + 'static {
        let (responder, answer) = oneshot::channel();
        {
            let mut open = self.lock();
            if let Some(previous) = open.take() {
                debug!(superseded = ?previous.confirmation, "dialog replaced");
                let _ = previous.responder.send(false);
            }
            *open = Some(OpenDialog {
                confirmation: confirmation.clone(),
                responder,
            });
        }
        self.changes.send_replace(Some(confirmation));
        async move { answer.await.unwrap_or(false) }
    }

    /// The confirmation currently showing.
    pub fn open(&self) -> Option<Confirmation> {
        self.lock().as_ref().map(|dialog| dialog.confirmation.clone())
    }

    pub fn watch(&self) -> watch::Receiver<Option<Confirmation>> {
        self.changes.subscribe()
    }

    /// Accept the open dialog. Returns false if none was open.
    pub fn confirm(&self) -> bool {
        self.resolve(true)
    }

    /// Dismiss the open dialog. Returns false if none was open.
    pub fn cancel(&self) -> bool {
        self.resolve(false)
    }

    fn resolve(&self, accepted: bool) -> bool {
        let Some(dialog) = self.lock().take() else {
            return false;
        };
        self.changes.send_replace(None);
        // The requester may have given up already.
        let _ = dialog.responder.send(accepted);
        true
    }
}
