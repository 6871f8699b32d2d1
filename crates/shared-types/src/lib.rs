//! # Shared Types Crate
//!
//! The single definition of the normalized event contract used by every
//! crate in the relay, from the producer's publisher to the HTTP boundary.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the event schema and its canonicalization
//!   rules live here and nowhere else.
//! - **Chain-Aware Addresses**: EVM addresses compare case-insensitively,
//!   Solana addresses do not; see [`chain::normalize_address`].
//! - **No Floats for Money**: amounts stay decimal strings on the wire and
//!   compare as [`U256`]; see [`amount`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod amount;
pub mod chain;
pub mod entities;
pub mod errors;

pub use amount::{compare_unsigned, is_unsigned_integer, parse_unsigned, ValueThreshold};
pub use primitive_types::U256;
pub use chain::{
    derive_event_id, is_hex_identifier, normalize_address, normalize_lookup_address,
    AddressFormat, Chain,
};
pub use entities::{EventType, NormalizedEvent, Token};
pub use errors::ValidationError;
