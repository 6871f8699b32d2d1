//! HTTP handlers, grouped by surface.

pub mod metrics;
pub mod query;
pub mod stream;
