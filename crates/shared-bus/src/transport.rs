//! # Transport Channel
//!
//! The broker seam between producer and consumer. Delivery is ephemeral:
//! a subscriber only sees messages published while it is subscribed, and a
//! dropped connection ends its stream. The publisher's retry loop and the
//! consumer's `event_id` dedup compensate for that.

use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use futures::stream::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

/// Raw payloads received from a channel. Ends when the connection is lost.
pub type MessageStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Errors from broker operations. All of them are worth retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("transport unreachable: {0}")]
    Unreachable(String),

    /// The broker answered with an error.
    #[error("transport command failed: {0}")]
    Command(String),

    /// The operation did not finish in time.
    #[error("transport operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Pub/sub broker abstraction.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Publish one payload; returns the number of subscribers that got it.
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, TransportError>;

    /// Subscribe to a channel.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError>;
}

/// In-process broker backed by `tokio::sync::broadcast`, one sender per
/// channel.
///
/// [`disconnect`](Self::disconnect) simulates an outage: live streams end
/// and every call fails with [`TransportError::Unreachable`] until
/// [`reconnect`](Self::reconnect).
pub struct InMemoryTransport {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    connected: AtomicBool,
    messages_published: AtomicU64,
    capacity: usize,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Drop every channel so live subscriptions end, and refuse new calls.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.channels.lock().clear();
        debug!("In-memory transport disconnected");
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        debug!("In-memory transport reconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Current subscriber count on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Messages accepted while connected.
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::Unreachable("in-memory transport is disconnected".into()))
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportChannel for InMemoryTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, TransportError> {
        self.ensure_connected()?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        // No receivers is not an error on a pub/sub broker.
        let receivers = self.sender(channel).send(payload).unwrap_or(0);
        debug!(channel, receivers, "Message published");
        Ok(receivers)
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        self.ensure_connected()?;
        let receiver = self.sender(channel).subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
            Ok(payload) => Some(payload),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                debug!(skipped, "Transport subscriber lagged, messages lost");
                None
            }
        });
        Ok(Box::pin(stream))
    }
}
