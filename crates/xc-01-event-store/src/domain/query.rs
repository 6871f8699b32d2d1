//! # Query Engine
//!
//! Filtering, ordering and pagination over most-recent-first event
//! sequences. The same [`EventFilter`] drives the in-memory path and the
//! durable SQL path so both return the same page for the same data.
//!
//! ## Semantics
//!
//! - All predicates are optional and conjunctive.
//! - `from` / `to` compare in each event's canonical address form.
//! - `min_value` compares decimal strings numerically; non-numeric values
//!   never match.
//! - A time range excludes events whose timestamp does not parse.
//! - Ascending order reverses the filtered sequence; pagination comes last.

use chrono::{DateTime, Utc};
use shared_types::{normalize_address, Chain, NormalizedEvent, ValueThreshold};
use tracing::debug;

/// Page size when none is requested.
pub const DEFAULT_LIMIT: usize = 50;

/// Largest page a caller may request.
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recent first (insertion order of the global sequence).
    #[default]
    Descending,
    /// Oldest first.
    Ascending,
}

/// Conjunctive filter plus ordering and pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub chain: Option<Chain>,
    pub token_symbol: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub min_value: Option<ValueThreshold>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            chain: None,
            token_symbol: None,
            from: None,
            to: None,
            min_value: None,
            start_time: None,
            end_time: None,
            order: SortOrder::Descending,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl EventFilter {
    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_token_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.token_symbol = Some(symbol.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_min_value(mut self, threshold: ValueThreshold) -> Self {
        self.min_value = Some(threshold);
        self
    }

    pub fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// `limit` capped at `MAX_LIMIT`; zero yields an empty page.
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_LIMIT)
    }

    fn has_time_range(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    /// True if `event` satisfies every predicate.
    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        if let Some(chain) = &self.chain {
            if event.chain_kind() != *chain {
                return false;
            }
        }

        if let Some(symbol) = &self.token_symbol {
            if event.token_symbol() != Some(symbol.as_str()) {
                return false;
            }
        }

        if self.from.is_some() || self.to.is_some() {
            let chain = event.chain_kind();
            if let Some(from) = &self.from {
                if normalize_address(&chain, from) != event.from {
                    return false;
                }
            }
            if let Some(to) = &self.to {
                if normalize_address(&chain, to) != event.to {
                    return false;
                }
            }
        }

        if let Some(threshold) = &self.min_value {
            if !threshold.admits(&event.value) {
                return false;
            }
        }

        if self.has_time_range() {
            let Some(at) = event.parsed_timestamp() else {
                debug!(
                    event_id = %event.event_id,
                    timestamp = %event.timestamp,
                    "Excluding event with unparsable timestamp from time-range query"
                );
                return false;
            };
            if self.start_time.is_some_and(|start| at < start) {
                return false;
            }
            if self.end_time.is_some_and(|end| at > end) {
                return false;
            }
        }

        true
    }

    /// Filter, order and paginate a most-recent-first sequence.
    pub fn apply<'a, I>(&self, events: I) -> Vec<NormalizedEvent>
    where
        I: IntoIterator<Item = &'a NormalizedEvent>,
    {
        let limit = self.effective_limit();
        let matching = events.into_iter().filter(|e| self.matches(e));

        match self.order {
            SortOrder::Descending => matching
                .skip(self.offset)
                .take(limit)
                .cloned()
                .collect(),
            SortOrder::Ascending => {
                let mut all: Vec<&NormalizedEvent> = matching.collect();
                all.reverse();
                all.into_iter()
                    .skip(self.offset)
                    .take(limit)
                    .cloned()
                    .collect()
            }
        }
    }
}
