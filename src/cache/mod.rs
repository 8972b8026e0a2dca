//! Session-scoped local cache.
//!
//! Best-effort key/value persistence of derived UI state so a reload does
//! not flash stale buttons while the authoritative subscription comes back.
//! Nothing here is a source of truth: every reader must tolerate a missing,
//! empty or corrupt value.

mod file;
mod following;
mod in_memory;

use thiserror::Error;

pub use file::FileSessionCache;
pub use following::FollowingCache;
pub use in_memory::InMemorySessionCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("cache lock poisoned")]
    Poisoned,
}

/// String key/value storage scoped to one browsing session.
pub trait SessionCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    fn remove(&self, key: &str) -> Result<(), CacheError>;
}
