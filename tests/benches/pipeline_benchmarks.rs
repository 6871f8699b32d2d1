//! # Cross-Chain Relay Pipeline Benchmarks
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | xc-01 Event Store | insert at capacity (evicting) | < 50µs |
//! | xc-01 Event Store | filtered recent query over 1000 events | < 1ms |
//! | xc-01 Event Store | wallet query | < 200µs |
//! | xc-03 Ingestion | decode + store + fan-out one payload | < 100µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_bus::InMemoryTransport;
use shared_types::ValueThreshold;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use xc_01_event_store::{EventFilter, EventStore, EventStoreApi, SortOrder, StoreConfig};
use xc_02_fanout_hub::{Hub, HubConfig};
use xc_03_event_ingestion::EventIngestor;
use xc_tests::fixtures::{eth_transfer, sol_transfer, ALICE_ETH};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn full_store(rt: &Runtime) -> Arc<EventStore> {
    let store = Arc::new(EventStore::new(StoreConfig::default()));
    rt.block_on(async {
        for n in 0..1_000 {
            let event = if n % 4 == 0 { sol_transfer(n) } else { eth_transfer(n) };
            store.add(event).await.unwrap();
        }
    });
    store
}

// ============================================================================
// XC-01: Event Store
// ============================================================================

fn bench_store_insert(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("xc-01-event-store");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(1));

    let store = full_store(&rt);
    let mut next = 10_000u32;
    group.bench_function("insert_evicting", |b| {
        b.iter(|| {
            next += 1;
            rt.block_on(store.add(eth_transfer(next))).unwrap()
        })
    });

    group.bench_function("insert_duplicate", |b| {
        let event = eth_transfer(next);
        b.iter(|| rt.block_on(store.add(black_box(event.clone()))).unwrap())
    });

    group.finish();
}

fn bench_store_queries(c: &mut Criterion) {
    let rt = runtime();
    let store = full_store(&rt);
    let mut group = c.benchmark_group("xc-01-event-store-queries");

    let filters = [
        ("default", EventFilter::default()),
        (
            "min_value",
            EventFilter::default().with_min_value(ValueThreshold::parse("500000").unwrap()),
        ),
        (
            "ascending_page",
            EventFilter::default()
                .with_order(SortOrder::Ascending)
                .with_page(100, 200),
        ),
    ];
    for (name, filter) in &filters {
        group.bench_with_input(BenchmarkId::new("get_recent", name), filter, |b, filter| {
            b.iter(|| rt.block_on(store.get_recent(black_box(filter))))
        });
    }

    group.bench_function("get_by_address", |b| {
        let filter = EventFilter::default();
        b.iter(|| rt.block_on(store.get_by_address(black_box(ALICE_ETH), &filter)))
    });

    group.finish();
}

// ============================================================================
// XC-03: Ingestion
// ============================================================================

fn bench_ingest_message(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("xc-03-event-ingestion");
    group.throughput(Throughput::Elements(1));

    let (ingestor, _subscriber) = rt.block_on(async {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let subscriber = hub.register().await.unwrap();
        let ingestor = EventIngestor::new(
            Arc::new(InMemoryTransport::new()),
            Arc::new(EventStore::new(StoreConfig::default())),
            hub,
        );
        (ingestor, subscriber)
    });

    let payloads: Vec<String> = (0..10_000)
        .map(|n| serde_json::to_string(&eth_transfer(n)).unwrap())
        .collect();
    let mut cursor = 0usize;
    group.bench_function("handle_message", |b| {
        b.iter(|| {
            let payload = &payloads[cursor % payloads.len()];
            cursor += 1;
            rt.block_on(ingestor.handle_message(black_box(payload)))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_store_insert,
    bench_store_queries,
    bench_ingest_message
);
criterion_main!(benches);
