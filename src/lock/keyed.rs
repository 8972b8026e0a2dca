use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Per-key async locks, created lazily and dropped when nobody holds or
/// waits on them.
///
/// Waiters are served first-come first-served (tokio's mutex is fair), which
/// is what keeps back-to-back writes for one entity in gesture order.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

/// Held while writing for one key. Releases (and prunes) on drop.
pub struct KeyedGuard {
    key: String,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let guard = self.slot(key).lock_owned().await;
        KeyedGuard {
            key: key.to_string(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Acquire without waiting. `None` when the key is held.
    pub fn try_acquire(&self, key: &str) -> Option<KeyedGuard> {
        let guard = self.slot(key).try_lock_owned().ok()?;
        Some(KeyedGuard {
            key: key.to_string(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        })
    }

    /// Keys that currently have a live slot.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        self.guard.take();
        // Map entry plus nobody else: no holder, no waiter.
        if let Some(slot) = slots.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.key);
            }
        }
    }
}
