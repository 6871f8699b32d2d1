//! # In-Memory Event Index
//!
//! ```text
//! global:      [e5, e4, e3, e2, e1]          ← front is most recent, cap N_total
//! by_address:  0xaaa → [e5, e3]              ← per-address, cap N_per_address
//!              0xbbb → [e5, e4, e3, e2, e1]
//! activity:    seq → address                 ← least recently active evicted first
//! refs:        event_id → live references     ← dedup key set
//! ```
//!
//! An event stays "known" for deduplication while any list still holds it.
//! Events are shared between lists through `Arc`, so an event touching two
//! addresses is stored once.

use super::config::StoreConfig;
use shared_types::NormalizedEvent;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Default)]
struct AddressEntry {
    last_active: u64,
    events: VecDeque<Arc<NormalizedEvent>>,
}

/// Bounded most-recent-first index over canonical events.
#[derive(Debug)]
pub struct EventIndex {
    max_events: usize,
    max_per_address: usize,
    max_addresses: usize,
    global: VecDeque<Arc<NormalizedEvent>>,
    by_address: HashMap<String, AddressEntry>,
    activity: BTreeMap<u64, String>,
    refs: HashMap<String, usize>,
    sequence: u64,
}

impl EventIndex {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            max_events: config.max_events,
            max_per_address: config.max_events_per_address,
            max_addresses: config.max_addresses,
            global: VecDeque::with_capacity(config.max_events),
            by_address: HashMap::new(),
            activity: BTreeMap::new(),
            refs: HashMap::new(),
            sequence: 0,
        }
    }

    /// True if an event with this id is held anywhere in the index.
    pub fn contains(&self, event_id: &str) -> bool {
        self.refs.contains_key(event_id)
    }

    /// Insert a canonical event. Returns `false` if its id is already known.
    pub fn insert(&mut self, event: NormalizedEvent) -> bool {
        if self.contains(&event.event_id) {
            return false;
        }

        let event = Arc::new(event);
        self.global.push_front(Arc::clone(&event));
        self.retain_ref(&event.event_id);
        while self.global.len() > self.max_events {
            if let Some(evicted) = self.global.pop_back() {
                self.release_ref(&evicted.event_id);
            }
        }

        let mut participants: Vec<&str> = Vec::with_capacity(2);
        for address in [event.from.as_str(), event.to.as_str()] {
            if !address.is_empty() && !participants.contains(&address) {
                participants.push(address);
            }
        }
        for address in participants {
            self.index_address(address, &event);
        }

        true
    }

    fn index_address(&mut self, address: &str, event: &Arc<NormalizedEvent>) {
        self.sequence += 1;
        let seq = self.sequence;

        let entry = self.by_address.entry(address.to_string()).or_default();
        if entry.last_active != 0 {
            self.activity.remove(&entry.last_active);
        }
        entry.last_active = seq;
        entry.events.push_front(Arc::clone(event));

        let mut evicted = Vec::new();
        while entry.events.len() > self.max_per_address {
            if let Some(old) = entry.events.pop_back() {
                evicted.push(old);
            }
        }

        self.activity.insert(seq, address.to_string());
        self.retain_ref(&event.event_id);
        for old in evicted {
            self.release_ref(&old.event_id);
        }

        while self.by_address.len() > self.max_addresses {
            self.evict_least_active();
        }
    }

    fn evict_least_active(&mut self) {
        let Some((_, address)) = self.activity.pop_first() else {
            return;
        };
        if let Some(entry) = self.by_address.remove(&address) {
            for event in entry.events {
                self.release_ref(&event.event_id);
            }
        }
    }

    fn retain_ref(&mut self, event_id: &str) {
        *self.refs.entry(event_id.to_string()).or_insert(0) += 1;
    }

    fn release_ref(&mut self, event_id: &str) {
        if let Some(count) = self.refs.get_mut(event_id) {
            *count -= 1;
            if *count == 0 {
                self.refs.remove(event_id);
            }
        }
    }

    /// Global sequence, most recent first.
    pub fn recent(&self) -> impl Iterator<Item = &NormalizedEvent> {
        self.global.iter().map(|e| e.as_ref())
    }

    /// Events touching a canonical address, most recent first.
    pub fn for_address(&self, address: &str) -> impl Iterator<Item = &NormalizedEvent> {
        self.by_address
            .get(address)
            .into_iter()
            .flat_map(|entry| entry.events.iter().map(|e| e.as_ref()))
    }

    /// Number of events in the global sequence.
    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    pub fn address_count(&self) -> usize {
        self.by_address.len()
    }

    /// Distinct event ids still referenced.
    pub fn known_ids(&self) -> usize {
        self.refs.len()
    }
}
