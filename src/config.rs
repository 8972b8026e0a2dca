//! Reconciler configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid reconciler config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the like and follow reconcilers.
///
/// Every field has a default, so partial JSON works:
///
/// ```
/// use feed_reconciler::ReconcilerConfig;
///
/// let config = ReconcilerConfig::from_json_str(r#"{"settle_delay_ms": 2500}"#).unwrap();
/// assert_eq!(config.settle_delay().as_millis(), 2500);
/// assert_eq!(config.products_collection, "products");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Grace period after a confirmed like write during which snapshots are
    /// still overridden by the pending value.
    pub settle_delay_ms: u64,
    /// Same guard for follow/unfollow writes.
    pub follow_settle_delay_ms: u64,
    pub products_collection: String,
    pub users_collection: String,
    /// Upper bound on the number of products in one feed query.
    pub feed_limit: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            follow_settle_delay_ms: 1000,
            products_collection: "products".to_string(),
            users_collection: "users".to_string(),
            feed_limit: 50,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn follow_settle_delay(&self) -> Duration {
        Duration::from_millis(self.follow_settle_delay_ms)
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_follow_settle_delay(mut self, delay: Duration) -> Self {
        self.follow_settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_products_collection(mut self, name: impl Into<String>) -> Self {
        self.products_collection = name.into();
        self
    }

    pub fn with_users_collection(mut self, name: impl Into<String>) -> Self {
        self.users_collection = name.into();
        self
    }

    pub fn with_feed_limit(mut self, limit: usize) -> Self {
        self.feed_limit = limit;
        self
    }
}
