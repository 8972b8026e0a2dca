use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

use super::Document;

type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

/// A live query. Yields the full matching result set on every change.
///
/// Dropping the subscription unsubscribes; [`Subscription::unsubscribe`]
/// does the same explicitly.
pub struct Subscription {
    snapshots: UnboundedReceiverStream<Vec<Document>>,
    on_unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    /// Wrap a snapshot channel. `on_unsubscribe` runs exactly once.
    pub fn new(
        receiver: UnboundedReceiver<Vec<Document>>,
        on_unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            snapshots: UnboundedReceiverStream::new(receiver),
            on_unsubscribe: Some(Box::new(on_unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.snapshots.close();
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl Stream for Subscription {
    type Item = Vec<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.snapshots).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.on_unsubscribe.is_some())
            .finish()
    }
}
