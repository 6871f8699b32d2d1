//! # Cross-Chain Relay Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs     # Shared transports and event builders
//! │   └── integration/    # Producer → transport → consumer flows
//! │       ├── delivery.rs
//! │       ├── reconnect.rs
//! │       └── live_stream.rs
//! └── benches/
//!     └── pipeline_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xc-tests
//! cargo test -p xc-tests integration::reconnect
//! cargo bench -p xc-tests
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod fixtures;
pub mod integration;
