//! # Live Streaming
//!
//! ```text
//! publisher ──→ transport ──→ ingestor ──→ hub ──┬──→ SSE client A
//!                                                └──→ SSE client B
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{eth_transfer, eventually, fast_retry, Consumer};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use relay_runtime::{RelayConfig, RelayRuntime};
    use shared_bus::{EventPublisher, InMemoryTransport, EVENTS_CHANNEL};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tower::ServiceExt;
    use xc_01_event_store::{EventStoreApi, StoreConfig};
    use xc_04_api_gateway::{build_router, AppState, GatewayConfig};

    async fn next_frame<S>(frames: &mut S) -> String
    where
        S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
    {
        let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        String::from_utf8(frame.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_every_client_receives_each_new_event_once() {
        let broker = Arc::new(InMemoryTransport::new());
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(eventually(|| broker.subscriber_count(EVENTS_CHANNEL) == 1).await);

        let app = build_router(AppState::new(
            consumer.store.clone(),
            consumer.hub.clone(),
            GatewayConfig::default(),
        ));
        let mut clients = Vec::new();
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/events/subscribe")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            clients.push(response.into_body().into_data_stream());
        }

        let publisher = EventPublisher::with_policy(broker.clone(), EVENTS_CHANNEL, fast_retry(3));
        let first = eth_transfer(1);
        let second = eth_transfer(2);
        publisher.publish(&first).await.unwrap();
        publisher.publish(&first).await.unwrap();
        publisher.publish(&second).await.unwrap();

        for frames in &mut clients {
            let a = next_frame(frames).await;
            let b = next_frame(frames).await;
            assert!(a.starts_with("data:") && a.contains(&first.event_id));
            assert!(b.starts_with("data:") && b.contains(&second.event_id));
        }

        drop(clients);
        assert!(eventually(|| consumer.ingestor.stats().duplicates == 1).await);
        assert!(consumer.stop().await);
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_dropped_without_stalling_others() {
        let broker = Arc::new(InMemoryTransport::new());
        let consumer = Consumer::start(broker.clone(), StoreConfig::default());
        assert!(eventually(|| broker.subscriber_count(EVENTS_CHANNEL) == 1).await);

        let mut slow = consumer.hub.register().await.unwrap();
        let mut fast = consumer.hub.register().await.unwrap();

        let publisher = EventPublisher::with_policy(broker.clone(), EVENTS_CHANNEL, fast_retry(3));
        for n in 1..=80 {
            let event = eth_transfer(n);
            publisher.publish(&event).await.unwrap();
            let message = tokio::time::timeout(Duration::from_secs(2), fast.next())
                .await
                .unwrap()
                .unwrap();
            assert!(message.contains(&event.event_id));
        }

        let stats = consumer.hub.stats().await.unwrap();
        assert_eq!(stats.dropped_slow, 1);
        assert_eq!(stats.subscribers, 1);

        // The slow client gets what was buffered, then its stream ends.
        let mut buffered = 0;
        while slow.next().await.is_some() {
            buffered += 1;
        }
        assert_eq!(buffered, 64);
        assert!(consumer.stop().await);
    }

    async fn read_until(stream: &mut TcpStream, buf: &mut Vec<u8>, needle: &str) -> String {
        let mut chunk = [0u8; 4096];
        loop {
            let text = String::from_utf8_lossy(buf).to_string();
            if text.contains(needle) {
                return text;
            }
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "connection closed before {needle:?}");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[tokio::test]
    async fn test_runtime_serves_history_and_live_over_http() {
        let broker = Arc::new(InMemoryTransport::new());
        let runtime = Arc::new(RelayRuntime::new(
            RelayConfig::new("redis://unused"),
            broker.clone(),
            None,
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.run(Some(listener)).await })
        };
        assert!(eventually(|| broker.subscriber_count(EVENTS_CHANNEL) == 1).await);

        let publisher = EventPublisher::with_policy(broker.clone(), EVENTS_CHANNEL, fast_retry(3));
        let historic = eth_transfer(1);
        publisher.publish(&historic).await.unwrap();
        assert!(eventually(|| runtime.store().stats().cached_events == 1).await);

        let mut http = TcpStream::connect(addr).await.unwrap();
        http.write_all(b"GET /transactions HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut body = Vec::new();
        http.read_to_end(&mut body).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("HTTP/1.1 200"));
        assert!(text.contains(&historic.event_id));

        let mut sse = TcpStream::connect(addr).await.unwrap();
        sse.write_all(b"GET /events/subscribe HTTP/1.1\r\nHost: relay\r\n\r\n")
            .await
            .unwrap();
        let mut buf = Vec::new();
        let head = read_until(&mut sse, &mut buf, "\r\n\r\n").await;
        assert!(head.starts_with("HTTP/1.1 200"));
        assert!(head.to_ascii_lowercase().contains("text/event-stream"));

        let live = eth_transfer(2);
        publisher.publish(&live).await.unwrap();
        let stream = read_until(&mut sse, &mut buf, &live.event_id).await;
        assert!(stream.contains("data:"));
        assert!(!stream.contains(&historic.event_id));

        runtime.shutdown();
        let summary = tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(summary.ingest.stored, 2);
    }
}
