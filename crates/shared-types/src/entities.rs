//! # Normalized Event
//!
//! The chain-agnostic record that every producer emits and every consumer
//! stores. It is serialized as JSON both on the broker and over HTTP.
//!
//! ## Invariants
//!
//! - `event_id` is derived from `(chain, tx_hash)` and is the dedup key.
//! - `value` is a base-10 integer string in the smallest unit.
//! - `from` / `to` are in the chain's canonical form once
//!   [`NormalizedEvent::canonicalize`] has run.

use crate::amount::is_unsigned_integer;
use crate::chain::{derive_event_id, normalize_address, Chain};
use crate::errors::ValidationError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token metadata for non-native transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Kind of activity an event records.
///
/// Unknown tags survive a round trip through [`EventType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Transfer,
    Erc20Transfer,
    SplTransfer,
    Mint,
    Burn,
    Swap,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Transfer => "transfer",
            EventType::Erc20Transfer => "erc20_transfer",
            EventType::SplTransfer => "spl_transfer",
            EventType::Mint => "mint",
            EventType::Burn => "burn",
            EventType::Swap => "swap",
            EventType::Other(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "transfer" => EventType::Transfer,
            "erc20_transfer" => EventType::Erc20Transfer,
            "spl_transfer" => EventType::SplTransfer,
            "mint" => EventType::Mint,
            "burn" => EventType::Burn,
            "swap" => EventType::Swap,
            _ => EventType::Other(tag),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized cross-chain transaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Dedup key, e.g. `eth:0xabc...` or `sol:<signature>`.
    #[serde(default)]
    pub event_id: String,
    pub chain: String,
    #[serde(default)]
    pub network: String,
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    /// RFC 3339 UTC timestamp.
    #[serde(default)]
    pub timestamp: String,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    pub event_type: EventType,
    /// Original chain data, kept for audit and replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<serde_json::Value>,
}

impl NormalizedEvent {
    /// Start a native `transfer` event; `event_id` is derived immediately.
    pub fn new(
        chain: &Chain,
        network: impl Into<String>,
        tx_hash: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let tx_hash = tx_hash.into();
        Self {
            event_id: derive_event_id(chain, &tx_hash),
            chain: chain.as_str().to_string(),
            network: network.into(),
            tx_hash,
            block_number: None,
            slot: None,
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            from: String::new(),
            to: String::new(),
            value: "0".to_string(),
            token: None,
            event_type: EventType::Transfer,
            raw_payload: None,
        }
    }

    pub fn with_participants(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn with_slot(mut self, slot: u64) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_raw_payload(mut self, raw: serde_json::Value) -> Self {
        self.raw_payload = Some(raw);
        self
    }

    /// Decode an event from a transport payload.
    pub fn from_json(payload: &str) -> Result<Self, ValidationError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn chain_kind(&self) -> Chain {
        Chain::parse(&self.chain)
    }

    /// Parsed event time, if the timestamp is valid RFC 3339.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn token_symbol(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.symbol.as_str())
    }

    /// Check the contract without modifying the event.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.chain.trim().is_empty() {
            return Err(ValidationError::MissingField("chain"));
        }
        if self.tx_hash.trim().is_empty() {
            return Err(ValidationError::MissingField("tx_hash"));
        }
        if !is_unsigned_integer(&self.value) {
            return Err(ValidationError::InvalidValue {
                value: self.value.clone(),
            });
        }
        Ok(())
    }

    /// Validate and rewrite into canonical form.
    ///
    /// The chain name is lowercased, `from` / `to` follow the chain's address
    /// rules and a missing `event_id` is derived from `(chain, tx_hash)`.
    pub fn canonicalize(mut self) -> Result<Self, ValidationError> {
        self.validate()?;
        let chain = self.chain_kind();
        self.chain = chain.as_str().to_string();
        self.from = normalize_address(&chain, &self.from);
        self.to = normalize_address(&chain, &self.to);
        if self.event_id.trim().is_empty() {
            self.event_id = derive_event_id(&chain, &self.tx_hash);
        }
        Ok(self)
    }

    /// True if `address` (already canonical) is a participant.
    pub fn involves(&self, address: &str) -> bool {
        self.from == address || self.to == address
    }
}
