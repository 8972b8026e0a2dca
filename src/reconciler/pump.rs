use std::sync::{Mutex, Weak};

use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::store::{Document, Subscription};

/// Something that merges full snapshots into visible state.
pub(crate) trait ApplySnapshot: Send + Sync + 'static {
    fn apply_snapshot(&self, snapshot: Vec<Document>);
}

/// Feed every snapshot from `subscription` into `target` until the stream
/// ends, the target is dropped, or the task is aborted. The subscription is
/// owned by the task, so aborting it unsubscribes.
pub(crate) fn spawn_pump<T: ApplySnapshot>(
    target: Weak<T>,
    mut subscription: Subscription,
    label: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            let Some(reconciler) = target.upgrade() else {
                break;
            };
            reconciler.apply_snapshot(snapshot);
        }
        debug!(reconciler = label, "snapshot pump stopped");
    })
}

/// Slot holding the running pump, if any.
#[derive(Default)]
pub(crate) struct PumpSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PumpSlot {
    /// Install a new pump, returning the previous one for the caller to stop.
    pub(crate) fn replace(&self, handle: JoinHandle<()>) -> Option<JoinHandle<()>> {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle)
    }

    pub(crate) fn take(&self) -> Option<JoinHandle<()>> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Abort a pump and wait until its future (and subscription) is dropped.
pub(crate) async fn stop_pump(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
        // Cancelled or already finished; either way the subscription is gone.
        let _ = handle.await;
    }
}
