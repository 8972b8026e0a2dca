#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use feed_reconciler::{
    Document, FollowReconciler, FollowingCache, InMemoryDocumentStore, InMemorySessionCache,
    InMemorySink, InteractionKind, ReconcileError, ReconcilerConfig, SessionCache, StoreError,
    WatchAuth,
};
use serde_json::json;
use support::{capture_bus, drain, user, USERS};

struct Harness {
    store: InMemoryDocumentStore,
    cache: InMemorySessionCache,
    sink: InMemorySink,
    follows: FollowReconciler<InMemoryDocumentStore>,
}

fn harness() -> Harness {
    let store = InMemoryDocumentStore::new();
    let cache = InMemorySessionCache::new();
    let (bus, sink) = capture_bus();
    let follows = FollowReconciler::new(
        store.clone(),
        bus,
        FollowingCache::new(Arc::new(cache.clone())),
        ReconcilerConfig::default(),
    );
    Harness {
        store,
        cache,
        sink,
        follows,
    }
}

#[tokio::test(start_paused = true)]
async fn attach_restores_from_cache_then_follows_the_user_document() {
    let h = harness();
    h.cache
        .set("following:u1", r#"["s1","s2"]"#.to_string())
        .unwrap();
    h.store.seed(
        USERS,
        vec![Document::from_value("u1", json!({"following": ["s2", "s3"]}))],
    );

    h.follows.restore(&user("u1"));
    assert!(h.follows.is_following("s1"), "cache shows before the subscription");

    h.follows
        .attach(&WatchAuth::signed_in(user("u1")))
        .await
        .unwrap();
    drain().await;
    assert!(!h.follows.is_following("s1"));
    assert!(h.follows.is_following("s3"));
    assert_eq!(
        h.cache.get("following:u1").unwrap().as_deref(),
        Some(r#"["s2","s3"]"#)
    );
}

#[tokio::test(start_paused = true)]
async fn pending_follow_survives_a_stale_user_snapshot() {
    let h = harness();
    h.store
        .seed(USERS, vec![Document::from_value("u1", json!({"following": []}))]);
    h.follows
        .attach(&WatchAuth::signed_in(user("u1")))
        .await
        .unwrap();
    drain().await;

    let outcome = h.follows.follow("s1", Some(&user("u1"))).await.unwrap();
    assert!(outcome.changed);
    assert_eq!(h.sink.kinds(), vec![InteractionKind::Follow]);

    h.store
        .deliver(USERS, vec![Document::from_value("u1", json!({"following": []}))]);
    drain().await;
    assert!(h.follows.is_following("s1"));

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(h.follows.pending_len(), 0);
    h.store
        .deliver(USERS, vec![Document::from_value("u1", json!({"following": []}))]);
    drain().await;
    assert!(!h.follows.is_following("s1"), "settled entries trust the store");
}

#[tokio::test(start_paused = true)]
async fn writes_for_one_user_are_serialized() {
    let h = harness();
    h.store.set_write_latency(Duration::from_millis(100));
    let u1 = user("u1");

    let (a, b) = tokio::join!(
        h.follows.follow("s1", Some(&u1)),
        h.follows.follow("s2", Some(&u1)),
    );
    a.unwrap();
    b.unwrap();

    let writes = h.store.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[1].fields["following"], json!(["s1", "s2"]));
    assert_eq!(
        h.store.document(USERS, "u1").unwrap().get("following"),
        Some(&json!(["s1", "s2"]))
    );
}

#[tokio::test(start_paused = true)]
async fn queued_write_does_not_resend_a_failed_follow() {
    let h = harness();
    h.store.set_write_latency(Duration::from_millis(100));
    h.store.fail_next_writes(1, StoreError::Timeout);
    let u1 = user("u1");

    let (a, b) = tokio::join!(
        h.follows.follow("s1", Some(&u1)),
        h.follows.follow("s2", Some(&u1)),
    );
    assert!(matches!(a, Err(ReconcileError::WriteFailed { ref id, .. }) if id == "s1"));
    assert!(b.unwrap().changed);

    let writes = h.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].fields["following"], json!(["s2"]));
    assert!(!h.follows.is_following("s1"));
    assert!(h.follows.is_following("s2"));
    assert_eq!(h.sink.kinds(), vec![InteractionKind::Follow]);
}

#[tokio::test(start_paused = true)]
async fn failed_unfollow_restores_membership() {
    let h = harness();
    let u1 = user("u1");
    h.follows.follow("s1", Some(&u1)).await.unwrap();
    h.store
        .fail_next_writes(1, StoreError::Unavailable("offline".into()));

    let err = h.follows.unfollow("s1", Some(&u1)).await.unwrap_err();
    assert!(matches!(err, ReconcileError::WriteFailed { .. }));
    assert!(h.follows.is_following("s1"));
    assert_eq!(h.sink.kinds(), vec![InteractionKind::Follow]);
}

#[tokio::test]
async fn signed_out_gestures_are_rejected() {
    let h = harness();
    assert_eq!(
        h.follows.follow("s1", None).await,
        Err(ReconcileError::Unauthenticated)
    );
    assert_eq!(
        h.follows.follow("bad/id", Some(&user("u1"))).await,
        Err(ReconcileError::InvalidEntityId("bad/id".into()))
    );
    assert_eq!(h.store.write_count(), 0);
    assert!(h.follows.following().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signing_out_clears_follow_state() {
    let h = harness();
    h.follows.restore(&user("u1"));
    h.follows.follow("s1", Some(&user("u1"))).await.unwrap();

    h.follows.attach(&WatchAuth::signed_out()).await.unwrap();
    assert!(h.follows.following().is_empty());
    assert_eq!(h.follows.user(), None);
    assert!(!h.follows.is_attached());
}

#[tokio::test(start_paused = true)]
async fn dispose_releases_everything() {
    let h = harness();
    h.follows
        .attach(&WatchAuth::signed_in(user("u1")))
        .await
        .unwrap();
    h.follows.follow("s1", Some(&user("u1"))).await.unwrap();
    assert_eq!(h.follows.outstanding_timers(), 1);
    assert_eq!(h.store.active_subscriptions(), 1);

    h.follows.dispose().await;
    assert_eq!(h.follows.outstanding_timers(), 0);
    assert_eq!(h.store.active_subscriptions(), 0);
    assert_eq!(
        h.follows.unfollow("s1", Some(&user("u1"))).await,
        Err(ReconcileError::Disposed)
    );
}
