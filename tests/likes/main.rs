mod fixtures;
#[path = "../support/mod.rs"]
mod support;

use std::time::Duration;

use feed_reconciler::{InteractionKind, ReconcileError, StoreError};
use fixtures::{product, Harness};
use serde_json::json;
use support::{drain, user, PRODUCTS};
use tokio::time::{sleep_until, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn stale_snapshot_during_write_does_not_undo_the_like() {
    let h = Harness::attached(vec![product("p1", &[])]).await;
    h.store.set_write_latency(ms(200));
    let start = Instant::now();

    let likes = h.likes.clone();
    let gesture = tokio::spawn(async move { likes.toggle("p1", Some(&user("u1"))).await });
    drain().await;
    assert_eq!(h.like_count("p1"), 1, "optimistic like is visible immediately");

    // t=150: the store echoes a snapshot taken before the write.
    sleep_until(start + ms(150)).await;
    h.store.deliver(PRODUCTS, vec![product("p1", &[])]);
    drain().await;
    assert_eq!(h.like_count("p1"), 1);
    assert!(h.likes.is_pending("p1"));

    // t=200: write lands.
    let outcome = gesture.await.unwrap().unwrap();
    assert!(outcome.liked);
    assert_eq!(outcome.like_count, 1);
    assert_eq!(h.remote_liked_by("p1"), json!(["u1"]));
    drain().await;
    assert_eq!(h.like_count("p1"), 1);

    // t=1200: the settle window has closed; snapshots are trusted again.
    sleep_until(start + ms(1201)).await;
    drain().await;
    assert!(!h.likes.is_pending("p1"));
    h.store.deliver(PRODUCTS, vec![product("p1", &["u1"])]);
    drain().await;
    assert_eq!(h.like_count("p1"), 1);
    assert_eq!(h.liked_by("p1"), vec!["u1"]);
}

#[tokio::test(start_paused = true)]
async fn settled_entities_adopt_remote_changes() {
    let h = Harness::attached(vec![product("p1", &[])]).await;
    h.likes.toggle("p1", Some(&user("u1"))).await.unwrap();

    // Someone else's like arrives while ours is still settling.
    h.store.deliver(PRODUCTS, vec![product("p1", &["u2"])]);
    drain().await;
    assert_eq!(h.liked_by("p1"), vec!["u1"]);

    tokio::time::sleep(ms(1001)).await;
    h.store.deliver(PRODUCTS, vec![product("p1", &["u1", "u2"])]);
    drain().await;
    assert_eq!(h.liked_by("p1"), vec!["u1", "u2"]);
    assert_eq!(h.like_count("p1"), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_write_reverts_to_the_last_confirmed_state() {
    let h = Harness::attached(vec![product("p1", &[])]).await;
    h.store
        .fail_next_writes(1, StoreError::Rejected("permission denied".into()));

    let err = h.likes.toggle("p1", Some(&user("u1"))).await.unwrap_err();
    assert_eq!(
        err,
        ReconcileError::WriteFailed {
            id: "p1".into(),
            source: StoreError::Rejected("permission denied".into()),
        }
    );
    assert!(h.liked_by("p1").is_empty());
    assert_eq!(h.like_count("p1"), 0);
    assert_eq!(h.likes.pending_len(), 0);
    assert_eq!(h.likes.outstanding_timers(), 0);
    assert!(h.sink.is_empty(), "failed gestures are not tracked");
}

#[tokio::test(start_paused = true)]
async fn quick_like_then_unlike_counts_nothing() {
    let h = Harness::attached(vec![product("p1", &[])]).await;
    h.store.set_write_latency(ms(50));
    let u1 = user("u1");

    let (first, second) = tokio::join!(
        h.likes.toggle("p1", Some(&u1)),
        h.likes.toggle("p1", Some(&u1)),
    );
    assert!(first.unwrap().liked);
    assert!(!second.unwrap().liked);

    assert!(h.liked_by("p1").is_empty());
    assert_eq!(h.like_count("p1"), 0);
    assert_eq!(h.remote_liked_by("p1"), json!([]));
    let writes = h.store.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].fields["likedBy"], json!(["u1"]));
    assert_eq!(writes[1].fields["likedBy"], json!([]));
    assert_eq!(
        h.sink.kinds(),
        vec![InteractionKind::Like, InteractionKind::Unlike]
    );
}

#[tokio::test(start_paused = true)]
async fn signed_out_gesture_changes_nothing() {
    let h = Harness::attached(vec![product("p1", &["u2"])]).await;
    let before = h.likes.visible();
    let mut changes = h.likes.watch();
    changes.mark_unchanged();

    let err = h.likes.toggle("p1", None).await.unwrap_err();
    assert_eq!(err, ReconcileError::Unauthenticated);
    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.likes.visible(), before);
    assert!(!changes.has_changed().unwrap());
    assert_eq!(h.likes.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_timers_and_subscription() {
    let h = Harness::attached(vec![product("p1", &[]), product("p2", &[])]).await;
    assert_eq!(h.store.active_subscriptions(), 1);
    assert!(h.likes.is_attached());

    h.likes.toggle("p1", Some(&user("u1"))).await.unwrap();
    h.likes.toggle("p2", Some(&user("u1"))).await.unwrap();
    assert_eq!(h.likes.outstanding_timers(), 2);

    h.likes.dispose().await;
    assert_eq!(h.likes.outstanding_timers(), 0);
    assert_eq!(h.store.active_subscriptions(), 0);
    assert_eq!(h.likes.pending_len(), 0);
    assert!(!h.likes.is_attached());

    assert_eq!(
        h.likes.toggle("p1", Some(&user("u1"))).await,
        Err(ReconcileError::Disposed)
    );
    // Deliveries after teardown are ignored.
    h.store.deliver(PRODUCTS, vec![product("p1", &["u7", "u8"])]);
    drain().await;
    assert_eq!(h.like_count("p1"), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_gestures_on_different_products_keep_both_pending() {
    let h = Harness::attached(vec![product("p1", &[]), product("p2", &["u3"])]).await;
    h.store.set_write_latency(ms(100));
    let u1 = user("u1");

    let (a, b) = tokio::join!(
        h.likes.toggle("p1", Some(&u1)),
        h.likes.toggle("p2", Some(&u1)),
    );
    a.unwrap();
    b.unwrap();
    assert!(h.likes.is_pending("p1"));
    assert!(h.likes.is_pending("p2"));

    h.store
        .deliver(PRODUCTS, vec![product("p1", &[]), product("p2", &["u3"])]);
    drain().await;
    assert_eq!(h.like_count("p1"), 1);
    assert_eq!(h.like_count("p2"), 2);
}

#[tokio::test(start_paused = true)]
async fn attach_waits_for_auth_and_applies_the_feed_limit() {
    let products: Vec<_> = (0..80).map(|i| product(&format!("p{i:02}"), &[])).collect();
    let h = Harness::new(products);
    let auth = feed_reconciler::WatchAuth::new();

    let likes = h.likes.clone();
    let waiting = auth.clone();
    let attach = tokio::spawn(async move {
        likes
            .attach(&waiting, feed_reconciler::Query::new())
            .await
    });
    drain().await;
    assert!(h.likes.visible().is_empty(), "no read before auth resolves");

    auth.sign_out();
    attach.await.unwrap().unwrap();
    assert_eq!(h.likes.visible().len(), 50);
    assert_eq!(h.likes.visible()[0].id.as_str(), "p00");
}

#[tokio::test(start_paused = true)]
async fn counter_only_documents_show_the_stored_count() {
    let h = Harness::new(vec![]);
    h.likes.reconcile(vec![feed_reconciler::Document::from_value(
        "p1",
        json!({"title": "Lamp", "likesCount": 7}),
    )]);
    assert_eq!(h.like_count("p1"), 7);

    // Liking starts from an empty set; the set wins from then on.
    let outcome = h.likes.toggle("p1", Some(&user("u1"))).await.unwrap();
    assert_eq!(outcome.like_count, 1);
}
