//! Expected-operation reconciliation
//!
//! A single deterministic pass over one identifier's event list against a
//! caller-supplied multiset of expected operation tags. Operations the
//! entity never produced come back as `leftover` (the failure signal);
//! observed operations outside the expected set come back as `unexpected`
//! (informational - whether they fail the check is the caller's explicit
//! configuration choice, never decided here).

use crate::types::Event;
use serde::Serialize;

/// Outcome of matching observed events against expected operations
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// Expected operations never observed; non-empty means the check failed
    pub leftover: Vec<String>,
    /// Observed events whose operation was not in the expected set
    pub unexpected: Vec<Event>,
}

impl Reconciliation {
    /// True when every expected operation was observed
    pub fn all_accounted(&self) -> bool {
        self.leftover.is_empty()
    }
}

/// Consume expected operations as events are scanned in stored order
///
/// Each event fulfills at most one instance of its operation tag in the
/// expected multiset; matching is order-insensitive, so any event carrying
/// the tag counts regardless of position. Events without a matching (or any)
/// operation are collected as unexpected and never abort the scan.
pub fn reconcile(events: &[Event], expected: &[String]) -> Reconciliation {
    let mut leftover: Vec<String> = expected.to_vec();
    let mut unexpected = Vec::new();
    for event in events {
        let matched = event
            .operation
            .as_deref()
            .and_then(|op| leftover.iter().position(|want| want == op));
        match matched {
            Some(pos) => {
                leftover.remove(pos);
            }
            None => unexpected.push(event.clone()),
        }
    }
    Reconciliation { leftover, unexpected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use chrono::{TimeZone, Utc};

    fn ts(sec: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2015, 3, 24, 11, 47, sec).unwrap()
    }

    fn event(sec: u32, op: &str) -> Event {
        Event {
            timestamp: ts(sec),
            source: None,
            operation: Some(op.to_string()),
        }
    }

    fn ops(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_coverage_any_order() {
        let events = vec![
            event(1, "start"),
            event(2, "create"),
            event(3, "destroy"),
            event(4, "die"),
        ];
        let expected = ops(&["create", "start", "die", "destroy"]);
        let result = reconcile(&events, &expected);
        assert!(result.all_accounted());
        assert!(result.unexpected.is_empty());
    }

    #[test]
    fn test_missing_operation_is_leftover() {
        let events = vec![event(1, "create"), event(2, "start"), event(3, "die")];
        let expected = ops(&["create", "start", "die", "kill"]);
        let result = reconcile(&events, &expected);
        assert_eq!(result.leftover, ops(&["kill"]));
        assert!(!result.all_accounted());
    }

    #[test]
    fn test_unexpected_operations_are_informational() {
        let events = vec![event(1, "create"), event(2, "oom"), event(3, "die")];
        let expected = ops(&["create", "die"]);
        let result = reconcile(&events, &expected);
        assert!(result.all_accounted());
        assert_eq!(result.unexpected.len(), 1);
        assert_eq!(result.unexpected[0].operation.as_deref(), Some("oom"));
    }

    #[test]
    fn test_multiset_semantics() {
        // Two restarts expected, only one observed
        let events = vec![event(1, "start"), event(2, "die"), event(3, "start")];
        let expected = ops(&["start", "start", "start", "die"]);
        let result = reconcile(&events, &expected);
        assert_eq!(result.leftover, ops(&["start"]));
        // Each event consumed one instance, none were unexpected
        assert!(result.unexpected.is_empty());
    }

    #[test]
    fn test_event_without_operation_is_unexpected() {
        let events = vec![Event {
            timestamp: ts(1),
            source: None,
            operation: None,
        }];
        let result = reconcile(&events, &ops(&["die"]));
        assert_eq!(result.leftover, ops(&["die"]));
        assert_eq!(result.unexpected.len(), 1);
    }

    #[test]
    fn test_empty_expected_set() {
        let events = vec![event(1, "create")];
        let result = reconcile(&events, &[]);
        assert!(result.all_accounted());
        assert_eq!(result.unexpected.len(), 1);
    }
}
