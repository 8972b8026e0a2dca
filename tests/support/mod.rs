//! Helpers shared by the integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use feed_reconciler::{InMemorySink, InteractionBus, UserId};

pub const PRODUCTS: &str = "products";
pub const USERS: &str = "users";

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

/// A bus whose only sink records every interaction.
pub fn capture_bus() -> (InteractionBus, InMemorySink) {
    let sink = InMemorySink::new("capture");
    let bus = InteractionBus::new();
    bus.add_sink(Arc::new(sink.clone()));
    (bus, sink)
}

/// Let spawned tasks (pump, writes, timers) run without advancing time.
pub async fn drain() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
