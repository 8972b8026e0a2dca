use feed_reconciler::{
    Document, InMemoryDocumentStore, InMemorySink, LikeReconciler, Query, ReconcilerConfig,
    WatchAuth,
};
use serde_json::json;

use crate::support::{capture_bus, user, PRODUCTS};

pub fn product(id: &str, liked_by: &[&str]) -> Document {
    Document::from_value(
        id,
        json!({
            "title": format!("Product {id}"),
            "sellerId": "s1",
            "likedBy": liked_by,
            "likeCount": liked_by.len(),
        }),
    )
}

pub struct Harness {
    pub store: InMemoryDocumentStore,
    pub likes: LikeReconciler<InMemoryDocumentStore>,
    pub sink: InMemorySink,
}

impl Harness {
    pub fn new(products: Vec<Document>) -> Self {
        let store = InMemoryDocumentStore::new();
        store.seed(PRODUCTS, products);
        let (bus, sink) = capture_bus();
        let likes = LikeReconciler::new(store.clone(), bus, ReconcilerConfig::default());
        Self { store, likes, sink }
    }

    /// Seeded store with a live subscription for `u1`.
    pub async fn attached(products: Vec<Document>) -> Self {
        let harness = Self::new(products);
        harness
            .likes
            .attach(&WatchAuth::signed_in(user("u1")), Query::new())
            .await
            .unwrap();
        harness
    }

    pub fn like_count(&self, id: &str) -> u64 {
        self.likes.product(id).map(|p| p.like_count()).unwrap_or_default()
    }

    pub fn liked_by(&self, id: &str) -> Vec<String> {
        self.likes
            .product(id)
            .and_then(|p| p.liked_by)
            .map(|set| set.iter().map(|u| u.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn remote_liked_by(&self, id: &str) -> serde_json::Value {
        self.store
            .document(PRODUCTS, id)
            .and_then(|doc| doc.get("likedBy").cloned())
            .unwrap_or(serde_json::Value::Null)
    }
}
