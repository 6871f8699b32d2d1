//! Cross-component flows.
//!
//! Every test runs the real producer and consumer components against the
//! in-process transport; only the broker is simulated.

mod delivery;
mod live_stream;
mod reconnect;
