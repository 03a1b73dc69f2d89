//! Docker Events Parser Library
//!
//! A stateless, reusable library for reconciling the line-oriented text
//! stream produced by `docker events` against a set of expected operations.
//!
//! # Architecture
//!
//! The library is intentionally minimal and focused on reconciliation:
//! - Extracts (identifier, event) records from captured event text
//! - Tolerates a bounded amount of unparseable noise
//! - Aggregates records into a per-identifier, time-sorted, dedup'd index
//! - Checks an identifier's events against an expected operation multiset
//!
//! The library does NOT:
//! - Run `docker` or manage the monitored container's lifetime
//! - Persist anything across runs
//! - Decide pass/fail policy for unexpected operations
//! - Log or print verdicts
//!
//! All lifecycle and reporting behaviour lives in the application layer
//! (docker-events-cli).
//!
//! # Example Usage
//!
//! ```
//! use docker_events_parser::{reconcile, EventIndex, Identifier, StreamParser};
//!
//! let captured = "2015-03-24T11:47:08.000000000-04:00 \
//!     4386fb97867d2b4027c5cdb1744b1e2e8e5b0d1f15b2d3f2b1c8b8b8b8b8b8b8: \
//!     (from busybox:latest) die\n";
//!
//! let records = StreamParser::new(Some(3)).parse(captured).unwrap();
//! let mut index = EventIndex::new();
//! index.merge(records);
//!
//! let cid = Identifier::ContainerId(
//!     "4386fb97867d2b4027c5cdb1744b1e2e8e5b0d1f15b2d3f2b1c8b8b8b8b8b8b8".into(),
//! );
//! let expected = vec!["die".to_string()];
//! let result = reconcile(index.events(&cid).unwrap(), &expected);
//! assert!(result.all_accounted());
//! ```

// Public modules
pub mod index;
pub mod line;
pub mod reconcile;
pub mod stream;
pub mod types;

// Re-export main types for convenience
pub use index::EventIndex;
pub use line::LineParser;
pub use reconcile::{reconcile, Reconciliation};
pub use stream::StreamParser;
pub use types::{
    Event, Identifier, ParsedRecord, ParserError, Result, Timestamp, CONTAINER_ID_LEN,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
