#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use feed_reconciler::{
    Confirmation, Document, FeedSession, InMemoryDocumentStore, InMemorySessionCache, InMemorySink,
    InteractionKind, Notice, Query, ReconcilerConfig, SellerId, StoreError, WatchAuth,
};
use serde_json::json;
use support::{capture_bus, drain, user, PRODUCTS, USERS};

type Session = FeedSession<InMemoryDocumentStore, WatchAuth>;

struct Harness {
    store: InMemoryDocumentStore,
    sink: InMemorySink,
    auth: WatchAuth,
    session: Arc<Session>,
}

async fn open(auth: WatchAuth) -> Harness {
    let store = InMemoryDocumentStore::new();
    store.seed(
        PRODUCTS,
        vec![
            Document::from_value(
                "p1",
                json!({"title": "Lamp", "sellerId": "s1", "likedBy": []}),
            ),
            Document::from_value(
                "p2",
                json!({"title": "Desk", "sellerId": "s2", "likes": {"u1": true}}),
            ),
        ],
    );
    store.seed(
        USERS,
        vec![Document::from_value("u1", json!({"following": ["s2"]}))],
    );

    let (bus, sink) = capture_bus();
    let session = FeedSession::new(
        store.clone(),
        auth.clone(),
        bus,
        Arc::new(InMemorySessionCache::new()),
        ReconcilerConfig::default(),
    );
    session.open(Query::new()).await.unwrap();
    drain().await;
    Harness {
        store,
        sink,
        auth,
        session: Arc::new(session),
    }
}

#[tokio::test(start_paused = true)]
async fn signed_out_gestures_ask_for_login() {
    let h = open(WatchAuth::signed_out()).await;
    assert_eq!(h.session.likes().visible().len(), 2);

    assert_eq!(h.session.like("p1").await, Some(Notice::LoginRequired));
    assert_eq!(h.session.follow("s1").await, Some(Notice::LoginRequired));
    assert_eq!(h.session.unfollow("s2").await, Some(Notice::LoginRequired));
    assert_eq!(h.session.share("p1"), Some(Notice::LoginRequired));
    h.session.view("p1");

    assert_eq!(h.store.write_count(), 0);
    assert!(h.sink.is_empty());
    assert_eq!(h.session.dialogs().open(), None);
}

#[tokio::test(start_paused = true)]
async fn failed_like_shows_a_notice_and_reverts() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    h.store.fail_next_writes(1, StoreError::Timeout);

    let notice = h.session.like("p1").await.unwrap();
    assert!(matches!(notice, Notice::ActionFailed { .. }));
    assert_eq!(notice.message(), "Couldn't update your like. Please try again.");
    assert_eq!(h.session.likes().product("p1").unwrap().like_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_ids_are_dropped_quietly() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert_eq!(h.session.like("").await, None);
    assert_eq!(h.session.like("missing").await, None);
    assert_eq!(h.session.follow(" s1").await, None);
    assert_eq!(h.session.share("a/b"), None);
    assert_eq!(h.store.write_count(), 0);
    assert!(h.sink.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unfollow_waits_for_confirmation() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert!(h.session.follows().is_following("s2"));

    let session = Arc::clone(&h.session);
    let cancelled = tokio::spawn(async move { session.unfollow("s2").await });
    drain().await;
    assert_eq!(
        h.session.dialogs().open(),
        Some(Confirmation::Unfollow {
            seller_id: SellerId::new("s2").unwrap()
        })
    );
    assert!(h.session.dialogs().cancel());
    assert_eq!(cancelled.await.unwrap(), None);
    assert!(h.session.follows().is_following("s2"));
    assert_eq!(h.store.write_count(), 0);

    let session = Arc::clone(&h.session);
    let confirmed = tokio::spawn(async move { session.unfollow("s2").await });
    drain().await;
    assert!(h.session.dialogs().confirm());
    assert_eq!(confirmed.await.unwrap(), None);
    assert!(!h.session.follows().is_following("s2"));
    assert_eq!(
        h.store.document(USERS, "u1").unwrap().get("following"),
        Some(&json!([]))
    );
    assert_eq!(h.sink.kinds(), vec![InteractionKind::Unfollow]);
}

#[tokio::test(start_paused = true)]
async fn unfollowing_a_seller_not_followed_skips_the_dialog() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert_eq!(h.session.unfollow("s9").await, None);
    assert_eq!(h.session.dialogs().open(), None);
}

#[tokio::test(start_paused = true)]
async fn remove_like_is_confirmation_gated() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert_eq!(h.session.likes().product("p2").unwrap().like_count(), 1);

    // Not liked yet: nothing to confirm.
    assert_eq!(h.session.remove_like("p1").await, None);
    assert_eq!(h.session.dialogs().open(), None);

    let session = Arc::clone(&h.session);
    let gesture = tokio::spawn(async move { session.remove_like("p2").await });
    drain().await;
    assert!(matches!(
        h.session.dialogs().open(),
        Some(Confirmation::RemoveLike { .. })
    ));
    h.session.dialogs().confirm();
    assert_eq!(gesture.await.unwrap(), None);
    assert_eq!(h.session.likes().product("p2").unwrap().like_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn share_and_view_are_tracked() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert_eq!(h.session.share("p1"), None);
    h.session.view("p2");

    let interactions = h.sink.interactions();
    assert_eq!(interactions.len(), 2);
    assert_eq!(interactions[0].kind, InteractionKind::Share);
    assert_eq!(interactions[1].entity_id, "p2");
    assert_eq!(interactions[1].user_id, user("u1"));
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_open_dialogs_and_subscriptions() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert_eq!(h.store.active_subscriptions(), 2);

    let session = Arc::clone(&h.session);
    let pending = tokio::spawn(async move { session.unfollow("s2").await });
    drain().await;
    h.session.dispose().await;

    assert_eq!(pending.await.unwrap(), None);
    assert_eq!(h.store.active_subscriptions(), 0);
    assert_eq!(h.session.like("p1").await, None);
}

#[tokio::test(start_paused = true)]
async fn signing_out_mid_session_requires_login_again() {
    let h = open(WatchAuth::signed_in(user("u1"))).await;
    assert_eq!(h.session.like("p1").await, None);

    h.auth.sign_out();
    assert_eq!(h.session.like("p1").await, Some(Notice::LoginRequired));
    assert_eq!(h.session.likes().product("p1").unwrap().like_count(), 1);
}
