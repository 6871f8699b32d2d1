//! Redis PUBLISH / SUBSCRIBE transport.

use crate::transport::{MessageStream, TransportChannel, TransportError};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, warn};

/// Transport over a Redis server.
///
/// Publishing reuses one multiplexed connection and drops it on error so the
/// next attempt reconnects. Each subscription gets its own pub/sub
/// connection; its stream ends when that connection closes.
pub struct RedisTransport {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisTransport {
    /// Parse the URL. No connection is made until first use.
    pub fn open(url: &str) -> Result<Self, TransportError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, TransportError> {
        if let Some(conn) = self.connection.lock().clone() {
            return Ok(conn);
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        *self.connection.lock() = Some(conn.clone());
        debug!("Redis publish connection established");
        Ok(conn)
    }
}

fn map_redis_error(e: redis::RedisError) -> TransportError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
        TransportError::Unreachable(e.to_string())
    } else {
        TransportError::Command(e.to_string())
    }
}

#[async_trait]
impl TransportChannel for RedisTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<usize, TransportError> {
        let mut conn = self.connection().await?;
        match conn.publish::<_, _, i64>(channel, payload).await {
            Ok(receivers) => Ok(usize::try_from(receivers).unwrap_or(0)),
            Err(e) => {
                *self.connection.lock() = None;
                Err(map_redis_error(e))
            }
        }
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(map_redis_error)?;
        pubsub.subscribe(channel).await.map_err(map_redis_error)?;
        debug!(channel, "Subscribed to Redis channel");

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(error = %e, "Dropping non-string Redis message");
                    None
                }
            }
        });
        Ok(Box::pin(stream))
    }
}
