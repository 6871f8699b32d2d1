//! # Delivery Flow
//!
//! ```text
//! ProducerPipeline ──→ EventPublisher ──(retry)──→ Transport ──→ EventIngestor
//!                                                                   │
//!                                                        EventStore ┴ Hub
//! ```
//!
//! Delivery is at-least-once; the store's `event_id` dedup makes repeated
//! deliveries invisible to readers and live subscribers.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        eth_transfer, eventually, fast_retry, sol_transfer, Consumer, FlakyTransport, ALICE_ETH,
        ALICE_SOL,
    };
    use futures::StreamExt;
    use shared_bus::{
        EventPublisher, InMemoryTransport, ProducerPipeline, PublishError, SubmitOutcome,
        TransportChannel, EVENTS_CHANNEL,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use xc_01_event_store::{EventFilter, EventStoreApi, StoreConfig};

    async fn subscribed(broker: &InMemoryTransport) -> bool {
        eventually(|| broker.subscriber_count(EVENTS_CHANNEL) > 0).await
    }

    #[tokio::test]
    async fn test_retried_publish_is_stored_once() {
        let broker = Arc::new(InMemoryTransport::new());
        let flaky = Arc::new(FlakyTransport::new(broker.clone(), 3));
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(subscribed(&broker).await);

        let mut live = consumer.hub.register().await.unwrap();
        let publisher = EventPublisher::with_policy(flaky.clone(), EVENTS_CHANNEL, fast_retry(8));

        let event = eth_transfer(1);
        let receipt = publisher.publish(&event).await.unwrap();
        assert_eq!(receipt.attempts, 4);
        assert_eq!(receipt.receivers, 1);
        assert_eq!(flaky.publish_calls(), 4);
        assert_eq!(publisher.stats().published(), 1);

        assert!(eventually(|| consumer.store.stats().cached_events == 1).await);

        // Producer-side replay of the same event.
        publisher.publish(&event).await.unwrap();
        assert!(eventually(|| consumer.ingestor.stats().duplicates == 1).await);

        let stored = consumer.store.get_recent(&EventFilter::default()).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event_id, event.event_id);
        assert_eq!(stored[0].from, ALICE_ETH.to_ascii_lowercase());

        let first = tokio::time::timeout(Duration::from_secs(1), live.next())
            .await
            .unwrap()
            .unwrap();
        assert!(first.contains(&event.event_id));
        assert!(
            tokio::time::timeout(Duration::from_millis(100), live.next())
                .await
                .is_err(),
            "duplicate must not be fanned out"
        );

        assert!(consumer.stop().await);
    }

    #[tokio::test]
    async fn test_exhausted_publish_reports_failure() {
        let broker = Arc::new(InMemoryTransport::new());
        let flaky = Arc::new(FlakyTransport::new(broker.clone(), u32::MAX));
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(subscribed(&broker).await);

        let publisher = EventPublisher::with_policy(flaky.clone(), EVENTS_CHANNEL, fast_retry(3));
        let event = eth_transfer(2);

        match publisher.publish(&event).await {
            Err(PublishError::Exhausted(failure)) => {
                assert_eq!(failure.event_id, event.event_id);
                assert_eq!(failure.chain, "ethereum");
                assert_eq!(failure.tx_hash, event.tx_hash);
                assert_eq!(failure.attempts, 3);
                assert!(failure.reason.contains("broker restarting"));
            }
            other => panic!("expected exhausted publish, got {other:?}"),
        }
        assert_eq!(flaky.publish_calls(), 3);
        assert_eq!(publisher.stats().failed(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(consumer.store.stats().cached_events, 0);
        assert!(consumer.stop().await);
    }

    #[tokio::test]
    async fn test_producer_pipeline_feeds_wallet_queries() {
        let broker = Arc::new(InMemoryTransport::new());
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(subscribed(&broker).await);

        let transport: Arc<dyn TransportChannel> = broker.clone();
        let pipeline = ProducerPipeline::new(Arc::new(EventPublisher::with_policy(
            transport,
            EVENTS_CHANNEL,
            fast_retry(3),
        )));

        let events = vec![eth_transfer(1), sol_transfer(1), eth_transfer(2), eth_transfer(1)];
        let stats = pipeline.run(futures::stream::iter(events)).await;
        assert_eq!(stats.published, 3);
        assert_eq!(stats.skipped, 1);

        assert!(eventually(|| consumer.store.stats().cached_events == 3).await);

        // Mixed-case hex lookups match the lowercased stored form.
        let eth = consumer
            .store
            .get_by_address(ALICE_ETH, &EventFilter::default())
            .await;
        let hashes: Vec<String> = eth.into_iter().map(|e| e.tx_hash).collect();
        assert_eq!(hashes, vec![eth_transfer(2).tx_hash, eth_transfer(1).tx_hash]);

        let sol = consumer
            .store
            .get_by_address(ALICE_SOL, &EventFilter::default())
            .await;
        assert_eq!(sol.len(), 1);
        let sol_lowered = consumer
            .store
            .get_by_address(&ALICE_SOL.to_ascii_lowercase(), &EventFilter::default())
            .await;
        assert!(sol_lowered.is_empty());

        assert!(consumer.stop().await);
    }

    #[tokio::test]
    async fn test_invalid_event_never_published() {
        let broker = Arc::new(InMemoryTransport::new());
        let transport: Arc<dyn TransportChannel> = broker.clone();
        let pipeline = ProducerPipeline::new(Arc::new(EventPublisher::with_policy(
            transport,
            EVENTS_CHANNEL,
            fast_retry(3),
        )));

        let bad = eth_transfer(3).with_value("-12");
        assert!(matches!(pipeline.submit(bad).await, SubmitOutcome::Rejected(_)));
        assert_eq!(broker.messages_published(), 0);
    }

    #[tokio::test]
    async fn test_global_cap_keeps_newest() {
        let broker = Arc::new(InMemoryTransport::new());
        let config = StoreConfig {
            max_events: 5,
            ..StoreConfig::default()
        };
        let consumer = Consumer::start(broker.clone(), config);
        assert!(subscribed(&broker).await);

        let publisher = EventPublisher::with_policy(broker.clone(), EVENTS_CHANNEL, fast_retry(3));
        for n in 1..=8 {
            publisher.publish(&eth_transfer(n)).await.unwrap();
        }

        assert!(eventually(|| consumer.ingestor.stats().stored == 8).await);

        let recent = consumer.store.get_recent(&EventFilter::default()).await;
        let blocks: Vec<_> = recent.iter().filter_map(|e| e.block_number).collect();
        assert_eq!(
            blocks,
            vec![19_000_008, 19_000_007, 19_000_006, 19_000_005, 19_000_004]
        );
        assert!(consumer.stop().await);
    }
}
