use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::SessionCache;
use crate::entity::{SellerId, UserId};

/// Mirrors a user's following set into the session cache.
///
/// Reads never fail: missing or corrupt entries yield an empty set. Write
/// failures are logged and dropped.
#[derive(Clone)]
pub struct FollowingCache {
    cache: Arc<dyn SessionCache>,
}

impl FollowingCache {
    pub fn new(cache: Arc<dyn SessionCache>) -> Self {
        Self { cache }
    }

    fn key(user: &UserId) -> String {
        format!("following:{}", user)
    }

    pub fn load(&self, user: &UserId) -> BTreeSet<SellerId> {
        let raw = match self.cache.get(&Self::key(user)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeSet::new(),
            Err(error) => {
                warn!(user_id = %user, %error, "session cache unreadable");
                return BTreeSet::new();
            }
        };
        // Decode leniently so one bad id does not discard the whole set.
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids
                .into_iter()
                .filter_map(|id| SellerId::new(id).ok())
                .collect(),
            Err(error) => {
                warn!(user_id = %user, %error, "discarding corrupt following cache entry");
                BTreeSet::new()
            }
        }
    }

    pub fn save(&self, user: &UserId, following: &BTreeSet<SellerId>) {
        let encoded = match serde_json::to_string(following) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(user_id = %user, %error, "could not encode following set");
                return;
            }
        };
        if let Err(error) = self.cache.set(&Self::key(user), encoded) {
            warn!(user_id = %user, %error, "could not persist following set");
        }
    }

    pub fn clear(&self, user: &UserId) {
        if let Err(error) = self.cache.remove(&Self::key(user)) {
            warn!(user_id = %user, %error, "could not clear following set");
        }
    }
}
