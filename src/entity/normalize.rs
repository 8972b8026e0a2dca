//! Store-boundary normalization.
//!
//! Documents in the wild carry the same concept under several field names
//! (`likedBy` vs `likes`, `likeCount` vs `likesCount`, ...). Each alias chain
//! is resolved exactly once here so the rest of the crate works with typed
//! values.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{LikedBy, SellerId, UserId};
use crate::store::Document;

pub(crate) const LIKED_BY_FIELDS: &[&str] = &["likedBy", "liked_by", "likes"];
pub(crate) const LIKE_COUNT_FIELDS: &[&str] = &["likeCount", "like_count", "likesCount"];
pub(crate) const SELLER_FIELDS: &[&str] = &["sellerId", "seller_id", "brandId", "userId"];
pub(crate) const TITLE_FIELDS: &[&str] = &["title", "name", "productName"];
pub(crate) const PRICE_FIELDS: &[&str] = &["price", "salePrice"];
pub(crate) const FOLLOWING_FIELDS: &[&str] = &["following", "followingSellers"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("document id {0:?} is not a valid id")]
    InvalidId(String),
    #[error("field {field} on {id} has an unusable value: {reason}")]
    InvalidField {
        id: String,
        field: String,
        reason: String,
    },
}

/// Reads a user-id set stored either as an array of ids or as a
/// `{uid: true}` map. Entries that are not valid ids are dropped.
pub(crate) fn user_set(value: &Value) -> Option<LikedBy> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str())
                .filter_map(|raw| UserId::new(raw).ok())
                .collect(),
        ),
        Value::Object(map) => Some(
            map.iter()
                .filter(|(_, flag)| flag.as_bool().unwrap_or(false))
                .filter_map(|(raw, _)| UserId::new(raw.as_str()).ok())
                .collect(),
        ),
        _ => None,
    }
}

pub(crate) fn liked_by(doc: &Document) -> Result<Option<LikedBy>, NormalizeError> {
    match doc.first_of(LIKED_BY_FIELDS) {
        None => Ok(None),
        Some((field, value)) => user_set(value)
            .map(Some)
            .ok_or_else(|| NormalizeError::InvalidField {
                id: doc.id.clone(),
                field: field.to_string(),
                reason: "expected an array or map of user ids".to_string(),
            }),
    }
}

/// Stored counters are informational. Negative or non-numeric values read
/// as zero rather than rejecting the whole document.
pub(crate) fn like_count(doc: &Document) -> u64 {
    match doc.first_of(LIKE_COUNT_FIELDS) {
        Some((_, value)) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or_else(|| {
                debug!(id = %doc.id, "ignoring unusable stored like counter");
                0
            }),
        None => 0,
    }
}

pub(crate) fn seller_id(doc: &Document) -> Option<SellerId> {
    doc.first_of(SELLER_FIELDS)
        .and_then(|(_, value)| value.as_str())
        .and_then(|raw| SellerId::new(raw).ok())
}

pub(crate) fn title(doc: &Document) -> String {
    doc.first_of(TITLE_FIELDS)
        .and_then(|(_, value)| value.as_str())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn price(doc: &Document) -> Option<f64> {
    doc.first_of(PRICE_FIELDS).and_then(|(_, value)| match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn following(doc: &Document) -> Option<Vec<SellerId>> {
    doc.first_of(FOLLOWING_FIELDS).and_then(|(_, value)| {
        value.as_array().map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .filter_map(|raw| SellerId::new(raw).ok())
                .collect()
        })
    })
}
