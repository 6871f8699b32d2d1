//! # Domain Layer
//!
//! Pure store logic: capacities, the bounded index and the query engine.
//! Nothing here performs I/O.

pub mod config;
pub mod errors;
pub mod index;
pub mod query;

pub use config::{ConfigError, StoreConfig};
pub use errors::StoreError;
pub use index::EventIndex;
pub use query::{EventFilter, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
