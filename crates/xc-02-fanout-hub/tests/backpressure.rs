//! Slow-subscriber isolation.

use futures::StreamExt;
use std::time::Duration;
use xc_02_fanout_hub::{Hub, HubConfig};

#[tokio::test]
async fn slow_subscriber_is_dropped_without_blocking_others() {
    let (hub, _task) = Hub::<String>::spawn(HubConfig::default().with_subscriber_capacity(4));

    let mut fast = hub.register().await.unwrap();
    let mut slow = hub.register().await.unwrap();

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(message) = fast.next().await {
            seen.push(message);
            if seen.len() == 50 {
                break;
            }
        }
        seen
    });

    for n in 0..50 {
        hub.broadcast(format!("event-{n}")).await.unwrap();
        // Let the reader keep pace.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let seen = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .unwrap()
        .unwrap();
    let expected: Vec<String> = (0..50).map(|n| format!("event-{n}")).collect();
    assert_eq!(seen, expected);

    // The slow one got what fit in its buffer, then its stream ended.
    let mut buffered = Vec::new();
    while let Some(message) = slow.next().await {
        buffered.push(message);
    }
    assert_eq!(buffered, expected[..4].to_vec());

    let stats = hub.stats().await.unwrap();
    assert_eq!(stats.dropped_slow, 1);
    assert_eq!(stats.subscribers, 0);
}

#[tokio::test]
async fn broadcaster_never_waits_on_a_stalled_subscriber() {
    let (hub, _task) = Hub::<u64>::spawn(HubConfig::default().with_subscriber_capacity(1));
    let _stalled = hub.register().await.unwrap();

    let sent = tokio::time::timeout(Duration::from_secs(2), async {
        for n in 0..10_000u64 {
            hub.broadcast(n).await.unwrap();
        }
    })
    .await;
    assert!(sent.is_ok());
    assert_eq!(hub.stats().await.unwrap().dropped_slow, 1);
}

#[tokio::test]
async fn late_subscriber_sees_only_later_broadcasts() {
    let (hub, _task) = Hub::<u32>::spawn(HubConfig::default());
    hub.broadcast(1).await.unwrap();

    let mut late = hub.register().await.unwrap();
    hub.broadcast(2).await.unwrap();
    drop(hub);

    assert_eq!(late.next().await, Some(2));
    assert_eq!(late.next().await, None);
}
