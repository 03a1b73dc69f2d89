//! Core types for the docker-events parser library
//!
//! This module defines the fundamental types produced while reconciling the
//! text stream emitted by `docker events`. The parser is stateless and only
//! outputs structured records - it does not run commands or render verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the parser
pub type Timestamp = DateTime<Utc>;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParserError>;

/// Length in characters of a full container id (64 hex digits).
///
/// Lines shorter than this cannot possibly carry an identifier and are
/// rejected before any field extraction is attempted.
pub const CONTAINER_ID_LEN: usize = 64;

/// Errors that can occur while parsing an event stream
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    /// Raised once the unparseable-line count exceeds the configured tolerance
    #[error(
        "excess noise (>{tolerance}) encountered after parsing {lines_processed} \
         lines (success on {parsed}); garbage: {noise:?}"
    )]
    ToleranceExceeded {
        /// Configured maximum number of noise lines
        tolerance: usize,
        /// Total lines examined before the parse was aborted
        lines_processed: usize,
        /// Lines that yielded a usable record
        parsed: usize,
        /// The noise lines collected so far, for diagnostics
        noise: Vec<String>,
    },
}

/// Identity of the entity an event line refers to
///
/// Either a full 64-hex-character container id or a repo[:tag] image
/// reference. Both are opaque strings at this layer, distinguished only by
/// which extraction pattern matched the line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Full-length container id (64 lowercase hex characters)
    ContainerId(String),
    /// Image reference in repo[:tag] form
    Image(String),
}

impl Identifier {
    /// The raw identifier string, regardless of kind
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::ContainerId(s) => s,
            Identifier::Image(s) => s,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured event extracted from one line of `docker events` output
///
/// Equality is the exact (timestamp, source, operation) triple - this is also
/// the dedup key used by [`EventIndex::merge`](crate::index::EventIndex::merge).
/// The timestamp field is declared first so the derived comparison checks it
/// first; timestamps differ most often between events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// When the daemon emitted the event
    pub timestamp: Timestamp,
    /// Optional `(from <ref>)` annotation, e.g. the originating image
    pub source: Option<String>,
    /// Trailing operation tag, e.g. "create", "start", "die"
    pub operation: Option<String>,
}

/// One (identifier, event) pair, produced for exactly one usable input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Which entity the line refers to
    pub id: Identifier,
    /// The structured event extracted from the line
    pub event: Event,
}
