//! # Chains and Address Canonicalization
//!
//! Address comparison rules differ per ledger: EVM hex addresses are
//! case-insensitive, Solana base58 addresses are not. Every index key and
//! every lookup goes through [`normalize_address`] so both sides agree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual layout of addresses and transaction identifiers on a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    /// `0x`-prefixed hex, case-insensitive.
    Hex,
    /// Base58, case-sensitive.
    Base58,
    /// Unknown ledger; decided per value.
    Detect,
}

/// Source ledger of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Chain {
    Ethereum,
    Solana,
    /// Any other ledger, keyed by its lowercase name.
    Other(String),
}

/// EVM-compatible ledgers that share Ethereum's address rules.
const EVM_CHAINS: &[&str] = &[
    "polygon", "arbitrum", "optimism", "base", "bsc", "avalanche",
];

impl Chain {
    /// Parse a chain name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "ethereum" | "eth" => Chain::Ethereum,
            "solana" | "sol" => Chain::Solana,
            _ => Chain::Other(lowered),
        }
    }

    /// Canonical name as carried in the `chain` field.
    pub fn as_str(&self) -> &str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Solana => "solana",
            Chain::Other(name) => name,
        }
    }

    /// Prefix used when deriving event identifiers.
    pub fn id_prefix(&self) -> &str {
        match self {
            Chain::Ethereum => "eth",
            Chain::Solana => "sol",
            Chain::Other(name) => name,
        }
    }

    pub fn address_format(&self) -> AddressFormat {
        match self {
            Chain::Ethereum => AddressFormat::Hex,
            Chain::Solana => AddressFormat::Base58,
            Chain::Other(name) if EVM_CHAINS.contains(&name.as_str()) => AddressFormat::Hex,
            Chain::Other(_) => AddressFormat::Detect,
        }
    }
}

impl From<String> for Chain {
    fn from(value: String) -> Self {
        Chain::parse(&value)
    }
}

impl From<Chain> for String {
    fn from(value: Chain) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for `0x`-prefixed hex strings with at least one digit.
pub fn is_hex_identifier(value: &str) -> bool {
    let Some(digits) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    else {
        return false;
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Canonical form of an address (or tx hash) on the given chain.
pub fn normalize_address(chain: &Chain, address: &str) -> String {
    normalize_with_format(chain.address_format(), address)
}

/// Canonicalize an address for lookup when the chain may be unknown.
///
/// With a chain hint the chain's rules apply; without one, hex addresses are
/// recognised by their shape and everything else is kept verbatim.
pub fn normalize_lookup_address(chain_hint: Option<&Chain>, address: &str) -> String {
    match chain_hint {
        Some(chain) => normalize_address(chain, address),
        None => normalize_with_format(AddressFormat::Detect, address),
    }
}

fn normalize_with_format(format: AddressFormat, address: &str) -> String {
    let trimmed = address.trim();
    match format {
        AddressFormat::Hex => trimmed.to_ascii_lowercase(),
        AddressFormat::Base58 => trimmed.to_string(),
        AddressFormat::Detect if is_hex_identifier(trimmed) => trimmed.to_ascii_lowercase(),
        AddressFormat::Detect => trimmed.to_string(),
    }
}

/// Deterministic event identifier for `(chain, tx_hash)`.
///
/// `eth:0xabc...`, `sol:<signature>`, `<chain>:<hash>` otherwise.
pub fn derive_event_id(chain: &Chain, tx_hash: &str) -> String {
    format!("{}:{}", chain.id_prefix(), normalize_address(chain, tx_hash))
}
