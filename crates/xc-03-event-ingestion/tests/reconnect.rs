//! Ingestion across a transport outage.

use chrono::{TimeZone, Utc};
use shared_bus::{InMemoryTransport, TransportChannel, EVENTS_CHANNEL};
use shared_types::{Chain, NormalizedEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use xc_01_event_store::{EventFilter, EventStore, EventStoreApi, StoreConfig};
use xc_02_fanout_hub::{Hub, HubConfig};
use xc_03_event_ingestion::{EventIngestor, ReconnectPolicy};

fn payload(tx: &str) -> String {
    let event = NormalizedEvent::new(
        &Chain::Solana,
        "mainnet-beta",
        tx,
        Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap(),
    )
    .with_participants("Sender1111", "Recv2222")
    .with_value("5000");
    serde_json::to_string(&event).unwrap()
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn resubscribes_after_outage_without_redelivering() {
    let transport = Arc::new(InMemoryTransport::new());
    let store = Arc::new(EventStore::new(StoreConfig::default()));
    let (hub, _hub_task) = Hub::<String>::spawn(HubConfig::default());
    let mut live = hub.register().await.unwrap();

    let ingestor = Arc::new(
        EventIngestor::new(transport.clone(), store.clone(), hub.clone()).with_reconnect_policy(
            ReconnectPolicy {
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                multiplier: 2,
            },
        ),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = {
        let ingestor = ingestor.clone();
        tokio::spawn(async move { ingestor.run(shutdown_rx).await })
    };

    wait_until(|| transport.subscriber_count(EVENTS_CHANNEL) == 1).await;
    transport.publish(EVENTS_CHANNEL, payload("sigA")).await.unwrap();
    wait_until(|| store.stats().cached_events == 1).await;

    // Outage: the live stream ends and subscribes fail for a while.
    transport.disconnect();
    wait_until(|| ingestor.stats().subscribe_failures >= 2).await;
    transport.reconnect();
    wait_until(|| transport.subscriber_count(EVENTS_CHANNEL) == 1).await;

    // The producer retried sigA across the outage, then moved on to sigB.
    transport.publish(EVENTS_CHANNEL, payload("sigA")).await.unwrap();
    transport.publish(EVENTS_CHANNEL, payload("sigB")).await.unwrap();
    wait_until(|| ingestor.stats().received == 3).await;

    let stats = ingestor.stats();
    assert_eq!(stats.stored, 2);
    assert_eq!(stats.duplicates, 1);
    assert!(stats.subscriptions >= 2);

    let recent = store.get_recent(&EventFilter::default()).await;
    let ids: Vec<_> = recent.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(ids, vec!["sol:sigB", "sol:sigA"]);

    // Each event reached live clients once.
    assert!(live.recv().await.unwrap().contains("sol:sigA"));
    assert!(live.recv().await.unwrap().contains("sol:sigB"));
    assert!(tokio::time::timeout(Duration::from_millis(50), live.recv())
        .await
        .is_err());

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn malformed_payloads_do_not_stop_the_loop() {
    let transport = Arc::new(InMemoryTransport::new());
    let store = Arc::new(EventStore::new(StoreConfig::default()));
    let (hub, _hub_task) = Hub::<String>::spawn(HubConfig::default());
    let ingestor = Arc::new(EventIngestor::new(transport.clone(), store.clone(), hub));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = {
        let ingestor = ingestor.clone();
        tokio::spawn(async move { ingestor.run(shutdown_rx).await })
    };

    wait_until(|| transport.subscriber_count(EVENTS_CHANNEL) == 1).await;
    transport.publish(EVENTS_CHANNEL, "garbage".into()).await.unwrap();
    transport
        .publish(EVENTS_CHANNEL, r#"{"chain":"solana","tx_hash":"x","from":"a","to":"b","value":"-1","event_type":"transfer"}"#.into())
        .await
        .unwrap();
    transport.publish(EVENTS_CHANNEL, payload("sigC")).await.unwrap();
    wait_until(|| ingestor.stats().received == 3).await;

    assert_eq!(ingestor.stats().rejected, 2);
    assert_eq!(store.stats().cached_events, 1);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
