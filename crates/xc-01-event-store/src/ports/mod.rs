//! # Ports
//!
//! - [`inbound`]: the API the ingestor and the HTTP layer drive.
//! - [`outbound`]: the durable backend the store may be given.

pub mod inbound;
pub mod outbound;

pub use inbound::{AddOutcome, EventStoreApi, StoreStats};
pub use outbound::{DurableEventStore, DurableInsert};
