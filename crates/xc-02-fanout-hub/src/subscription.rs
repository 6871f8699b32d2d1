//! Live subscription handed to a client.

use futures::Stream;
use serde::Serialize;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a hub registration.
///
/// Yields broadcasts in the order they were issued. The stream ends when the
/// hub drops this subscriber (too slow) or shuts down. Dropping the
/// subscription unregisters it.
pub struct Subscription<T> {
    id: SubscriberId,
    receiver: mpsc::Receiver<T>,
    unregister: mpsc::UnboundedSender<SubscriberId>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: mpsc::Receiver<T>,
        unregister: mpsc::UnboundedSender<SubscriberId>,
    ) -> Self {
        Self {
            id,
            receiver,
            unregister,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message, or `None` once the hub has let go of this subscriber.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        // Hub already gone is fine.
        let _ = self.unregister.send(self.id);
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
