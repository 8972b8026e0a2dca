use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::normalize::{self, NormalizeError};
use super::{EntityId, LikedBy, SellerId};
use crate::store::Document;

/// A likeable product as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub seller_id: Option<SellerId>,
    pub title: String,
    pub price: Option<f64>,
    /// `None` when the document did not carry a like set.
    pub liked_by: Option<LikedBy>,
    /// Separately stored counter. It can drift from the set.
    pub stored_like_count: u64,
}

impl Product {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            seller_id: None,
            title: String::new(),
            price: None,
            liked_by: None,
            stored_like_count: 0,
        }
    }

    /// Parse a store document into a product.
    ///
    /// Only an invalid id rejects the document. A like set of the wrong
    /// shape reads as absent, so the caller falls back to what it already
    /// shows.
    pub fn from_document(doc: &Document) -> Result<Self, NormalizeError> {
        let id = EntityId::new(doc.id.as_str())
            .map_err(|_| NormalizeError::InvalidId(doc.id.clone()))?;
        let liked_by = normalize::liked_by(doc).unwrap_or_else(|error| {
            warn!(%error, "ignoring unusable like set");
            None
        });
        Ok(Self {
            id,
            seller_id: normalize::seller_id(doc),
            title: normalize::title(doc),
            price: normalize::price(doc),
            liked_by,
            stored_like_count: normalize::like_count(doc),
        })
    }

    /// Visible like count. The set's cardinality wins whenever the set is known.
    pub fn like_count(&self) -> u64 {
        match &self.liked_by {
            Some(set) => set.len() as u64,
            None => self.stored_like_count,
        }
    }

    pub fn liked_by_or_empty(&self) -> LikedBy {
        self.liked_by.clone().unwrap_or_default()
    }

    /// Replace the like set and bring the stored counter in line with it.
    pub fn set_liked_by(&mut self, liked_by: LikedBy) {
        self.stored_like_count = liked_by.len() as u64;
        self.liked_by = Some(liked_by);
    }

    /// The partial document written for a like/unlike.
    pub(crate) fn like_fields(liked_by: &LikedBy) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("likedBy".to_string(), liked_by.to_value());
        fields.insert("likeCount".to_string(), Value::from(liked_by.len() as u64));
        fields
    }
}
