use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::UserId;

/// The set of users who like an entity. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikedBy(BTreeSet<UserId>);

impl LikedBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains(user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }

    /// Returns a copy with `user` added if absent, removed if present.
    pub fn toggled(&self, user: &UserId) -> LikedBy {
        let mut next = self.0.clone();
        if !next.remove(user) {
            next.insert(user.clone());
        }
        LikedBy(next)
    }

    /// Document representation: a JSON array of user ids.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|u| Value::String(u.as_str().to_string()))
                .collect(),
        )
    }
}

impl FromIterator<UserId> for LikedBy {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        LikedBy(iter.into_iter().collect())
    }
}
