use crate::Document;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::UnboundedReceiver;

/// State of a watched document: `None` while it does not exist.
pub type Snapshot = Option<Document>;

/// A live watch on one document.
///
/// The watch stays registered with its store until `unsubscribe` is called or
/// the value is dropped, whichever happens first.
pub struct Subscription {
    receiver: UnboundedReceiver<Snapshot>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(receiver: UnboundedReceiver<Snapshot>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Subscription {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next snapshot. `None` once the store stopped publishing.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
