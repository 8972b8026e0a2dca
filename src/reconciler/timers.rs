use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;

#[derive(Default)]
struct TimerState {
    next_id: u64,
    handles: HashMap<u64, AbortHandle>,
    closed: bool,
}

/// Settle timers owned by one reconciler.
///
/// Every scheduled callback is tracked until it fires or is aborted, so
/// teardown can cancel all of them and tests can count what is outstanding.
#[derive(Clone, Default)]
pub struct TimerSet {
    state: Arc<Mutex<TimerState>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` after `delay`. Returns false (and drops the callback)
    /// once the set has been closed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return false;
        }
        let id = state.next_id;
        state.next_id += 1;

        let shared = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let registered = shared
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .handles
                .remove(&id)
                .is_some();
            if registered {
                callback();
            }
        });
        state.handles.insert(id, task.abort_handle());
        true
    }

    /// Timers that have neither fired nor been aborted.
    pub fn outstanding(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .handles
            .len()
    }

    /// Abort every outstanding timer and refuse new ones.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
        for (_, handle) in state.handles.drain() {
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).closed
    }
}
