//! # Broker Outage Recovery
//!
//! The ingestor must survive the broker going away: its stream ends, it
//! resubscribes with backoff, and events replayed by the producer after the
//! outage are stored once.

#[cfg(test)]
mod tests {
    use crate::fixtures::{eth_transfer, eventually, fast_retry, Consumer};
    use shared_bus::{EventPublisher, InMemoryTransport, TransportChannel, EVENTS_CHANNEL};
    use std::sync::Arc;
    use std::time::Duration;
    use xc_01_event_store::{EventFilter, EventStoreApi, StoreConfig};

    #[tokio::test]
    async fn test_resubscribes_after_outage() {
        let broker = Arc::new(InMemoryTransport::new());
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(eventually(|| broker.subscriber_count(EVENTS_CHANNEL) == 1).await);

        let publisher = EventPublisher::with_policy(broker.clone(), EVENTS_CHANNEL, fast_retry(3));
        publisher.publish(&eth_transfer(1)).await.unwrap();
        assert!(eventually(|| consumer.store.stats().cached_events == 1).await);

        broker.disconnect();
        assert!(eventually(|| consumer.ingestor.stats().subscribe_failures >= 2).await);
        assert_eq!(broker.subscriber_count(EVENTS_CHANNEL), 0);

        broker.reconnect();
        assert!(eventually(|| broker.subscriber_count(EVENTS_CHANNEL) == 1).await);
        assert!(eventually(|| consumer.ingestor.stats().subscriptions >= 2).await);

        // Producer replays the event it was unsure about, then a new one.
        publisher.publish(&eth_transfer(1)).await.unwrap();
        publisher.publish(&eth_transfer(2)).await.unwrap();
        assert!(eventually(|| consumer.ingestor.stats().received == 3).await);

        let stats = consumer.ingestor.stats();
        assert_eq!(stats.stored, 2);
        assert_eq!(stats.duplicates, 1);

        let recent = consumer.store.get_recent(&EventFilter::default()).await;
        assert_eq!(recent.len(), 2);
        assert!(consumer.stop().await);
    }

    #[tokio::test]
    async fn test_shutdown_during_backoff() {
        let broker = Arc::new(InMemoryTransport::new());
        broker.disconnect();
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());

        assert!(eventually(|| consumer.ingestor.stats().subscribe_failures >= 1).await);
        assert!(consumer.stop().await, "ingestor must stop while waiting to retry");
    }

    #[tokio::test]
    async fn test_undecodable_messages_do_not_break_the_loop() {
        let broker = Arc::new(InMemoryTransport::new());
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(eventually(|| broker.subscriber_count(EVENTS_CHANNEL) == 1).await);

        broker
            .publish(EVENTS_CHANNEL, "not json".to_string())
            .await
            .unwrap();
        broker
            .publish(EVENTS_CHANNEL, r#"{"chain":"ethereum","tx_hash":""}"#.to_string())
            .await
            .unwrap();
        let valid = serde_json::to_string(&eth_transfer(9)).unwrap();
        broker.publish(EVENTS_CHANNEL, valid).await.unwrap();

        assert!(eventually(|| consumer.ingestor.stats().received == 3).await);
        let stats = consumer.ingestor.stats();
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.stored, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(broker.subscriber_count(EVENTS_CHANNEL), 1);
        assert!(consumer.stop().await);
    }
}
