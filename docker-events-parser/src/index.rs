//! Per-identifier event aggregation
//!
//! [`EventIndex`] merges parsed records into a time-ordered, duplicate-free
//! list per identifier. Merging is idempotent: feeding overlapping capture
//! windows through [`EventIndex::merge`] repeatedly converges on the same
//! index, so the caller can re-parse and re-merge as events trickle in.

use crate::types::{Event, Identifier, ParsedRecord};
use std::collections::BTreeMap;

/// Mapping from identifier to its deduplicated, time-sorted event list
///
/// Lists only grow; the index never shrinks. After every merge each list is
/// sorted ascending by timestamp and contains no two events with an equal
/// (timestamp, source, operation) triple.
#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    by_id: BTreeMap<Identifier, Vec<Event>>,
}

impl EventIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge records into the index, deduplicating and keeping time order
    ///
    /// Duplicate detection is a linear scan of the existing list; lists are
    /// bounded by real per-entity event counts and stay small. New events do
    /// not necessarily belong at the end, so the list is re-sorted after
    /// every append. The sort is stable, so events with equal timestamps
    /// keep their insertion order.
    pub fn merge<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ParsedRecord>,
    {
        for ParsedRecord { id, event } in records {
            let events = self.by_id.entry(id).or_default();
            if events.contains(&event) {
                continue;
            }
            events.push(event);
            events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
    }

    /// Events recorded for `id`, in timestamp order
    pub fn events(&self, id: &Identifier) -> Option<&[Event]> {
        self.by_id.get(id).map(Vec::as_slice)
    }

    /// True if any event was recorded for `id`
    pub fn contains(&self, id: &Identifier) -> bool {
        self.by_id.contains_key(id)
    }

    /// Iterate over (identifier, event list) pairs in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &[Event])> {
        self.by_id.iter().map(|(id, events)| (id, events.as_slice()))
    }

    /// Number of identifiers with at least one event
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if no identifier has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
