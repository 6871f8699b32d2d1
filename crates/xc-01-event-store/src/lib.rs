//! # Event Store Subsystem (xc-01)
//!
//! The consumer-side system of record for normalized events. Holds a bounded
//! most-recent-first cache with per-address indices, optionally backed by a
//! durable table, and answers filtered, paginated queries over both.
//!
//! ```text
//! Ingestor ──add()──→ ┌──────────────────────────────┐
//!                     │ EventStore                   │──→ DurableEventStore (optional)
//! HTTP ──get_*()────→ │  EventIndex (cap 1000 / 100) │      insert / query, 3s bound
//!                     └──────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement | Location |
//! |-----------|-------------|----------|
//! | Idempotent add | `event_id` refcount set | domain/index.rs |
//! | Bounded memory | global, per-address and address-count caps | domain/index.rs |
//! | Case-correct lookup | chain-aware canonicalization | shared-types chain.rs |
//! | Availability | durable errors fall back to cache | service.rs |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): index, filters, config; no I/O
//! - **Ports Layer** (`ports/`): `EventStoreApi` in, `DurableEventStore` out
//! - **Adapters Layer** (`adapters/`): PostgreSQL

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{PostgresEventStore, PostgresOptions};
pub use domain::{
    ConfigError, EventFilter, EventIndex, SortOrder, StoreConfig, StoreError, DEFAULT_LIMIT,
    MAX_LIMIT,
};
pub use ports::{AddOutcome, DurableEventStore, DurableInsert, EventStoreApi, StoreStats};
pub use service::EventStore;
