//! # Adapters
//!
//! - [`postgres`]: durable event table on PostgreSQL.

pub mod postgres;

pub use postgres::{build_select, PostgresEventStore, PostgresOptions};
