//! Single-line field extraction
//!
//! Each field of a `docker events` line (identifier, timestamp, source,
//! operation) has its own named extractor so every pattern can be tested in
//! isolation. A line yields a [`ParsedRecord`] only when BOTH an identifier
//! and a timestamp were found; source and operation are optional.
//!
//! Expected line shape, fields in order:
//!
//! ```text
//! 2015-03-24T11:47:08.000000000-04:00 <64-hex-id or repo[:tag]>: (from busybox:latest) start
//! ```

use crate::types::{Event, Identifier, ParsedRecord, Timestamp};
use chrono::{DateTime, Utc};
use regex::Regex;

/// Extracts structured events from single lines of `docker events` output
///
/// Patterns are compiled once per instance; construction is cheap enough to
/// do per parse call but the instance is reusable.
pub struct LineParser {
    cid: Regex,
    image: Regex,
    source: Regex,
    operation: Regex,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Create a parser with the standard docker event-line patterns
    pub fn new() -> Self {
        // Pattern literals below are fixed; compilation cannot fail.
        Self {
            cid: Regex::new(r"\s+([0-9a-f]{64}):\s+").expect("valid cid pattern"),
            image: Regex::new(
                r"\s+((?:[a-z0-9][a-z0-9._-]*/)*[a-z0-9][a-z0-9._-]*(?::[A-Za-z0-9._-]+)?):\s+",
            )
            .expect("valid image reference pattern"),
            source: Regex::new(r"\s+\(from\s+(\S+)\)\s+").expect("valid source pattern"),
            operation: Regex::new(r"\s+(\w+)$").expect("valid operation pattern"),
        }
    }

    /// Extract a full 64-hex-character container id, or None
    pub fn container_id(&self, line: &str) -> Option<Identifier> {
        self.cid
            .captures(line)
            .map(|caps| Identifier::ContainerId(caps[1].to_string()))
    }

    /// Extract a repo[:tag] image reference, or None
    pub fn image_ref(&self, line: &str) -> Option<Identifier> {
        self.image
            .captures(line)
            .map(|caps| Identifier::Image(caps[1].to_string()))
    }

    /// Extract whichever identifier kind matches first
    ///
    /// The container-id pattern is tried first; the image-reference pattern
    /// is only consulted when no full hex id is present. The two are never
    /// combined.
    pub fn identifier(&self, line: &str) -> Option<Identifier> {
        self.container_id(line).or_else(|| self.image_ref(line))
    }

    /// Parse the leading timestamp of a line, or None
    ///
    /// Accepts RFC 3339 with nanosecond precision and numeric offset (the
    /// daemon's native format) plus the legacy `2015-03-24 11:47:08 -0400`
    /// rendering. Any malformed or out-of-range value is simply "no
    /// timestamp", never an error.
    pub fn timestamp(&self, line: &str) -> Option<Timestamp> {
        let mut tokens = line.split_whitespace();
        let first = tokens.next()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(first) {
            return Some(dt.with_timezone(&Utc));
        }
        // Legacy format spans two tokens: date, time-of-day, offset
        if let (Some(time), Some(offset)) = (tokens.next(), tokens.next()) {
            let joined = format!("{} {} {}", first, time, offset);
            if let Ok(dt) = DateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S %z") {
                return Some(dt.with_timezone(&Utc));
            }
        }
        None
    }

    /// Extract the optional `(from <ref>)` annotation, or None
    pub fn source(&self, line: &str) -> Option<String> {
        self.source
            .captures(line)
            .map(|caps| caps[1].to_string())
    }

    /// Extract the trailing operation tag (final word of the line), or None
    pub fn operation(&self, line: &str) -> Option<String> {
        self.operation
            .captures(line)
            .map(|caps| caps[1].to_string())
    }

    /// Parse one line into a [`ParsedRecord`], or None if unusable
    ///
    /// A record requires an identifier AND a timestamp; missing source or
    /// operation never disqualifies a line.
    pub fn parse_line(&self, line: &str) -> Option<ParsedRecord> {
        let id = self.identifier(line)?;
        let timestamp = self.timestamp(line)?;
        Some(ParsedRecord {
            id,
            event: Event {
                timestamp,
                source: self.source(line),
                operation: self.operation(line),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CID: &str = "4386fb97867d2b4027c5cdb1744b1e2e8e5b0d1f15b2d3f2b1c8b8b8b8b8b8b8";

    fn event_line(op: &str) -> String {
        format!(
            "2015-03-24T11:47:08.000000000-04:00 {}: (from busybox:latest) {}",
            CID, op
        )
    }

    #[test]
    fn test_container_id_extraction() {
        let parser = LineParser::new();
        let line = event_line("start");
        assert_eq!(
            parser.container_id(&line),
            Some(Identifier::ContainerId(CID.to_string()))
        );
        // Too short, not followed by a colon
        assert_eq!(parser.container_id(" deadbeef: start"), None);
    }

    #[test]
    fn test_image_ref_extraction() {
        let parser = LineParser::new();
        let line = "2015-03-24T11:47:08.000000000-04:00 busybox:latest: untag event";
        assert_eq!(
            parser.image_ref(line),
            Some(Identifier::Image("busybox:latest".to_string()))
        );
        let registry = "2015-03-24T11:47:08.000000000-04:00 docker.io/library/busybox:1.36: untag";
        assert_eq!(
            parser.image_ref(registry),
            Some(Identifier::Image("docker.io/library/busybox:1.36".to_string()))
        );
    }

    #[test]
    fn test_identifier_prefers_container_id() {
        let parser = LineParser::new();
        let line = event_line("start");
        // The image pattern would also match the hex id; the cid pattern wins
        assert_eq!(
            parser.identifier(&line),
            Some(Identifier::ContainerId(CID.to_string()))
        );
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let parser = LineParser::new();
        let ts = parser.timestamp(&event_line("die")).unwrap();
        let expected = Utc.with_ymd_and_hms(2015, 3, 24, 15, 47, 8).unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_timestamp_legacy_format() {
        let parser = LineParser::new();
        let line = format!("2015-03-24 11:47:08 -0400 {}: start", CID);
        let ts = parser.timestamp(&line).unwrap();
        let expected = Utc.with_ymd_and_hms(2015, 3, 24, 15, 47, 8).unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_timestamp_garbage_is_none() {
        let parser = LineParser::new();
        assert_eq!(parser.timestamp("not-a-time at all"), None);
        assert_eq!(parser.timestamp(""), None);
        // Out-of-range month
        assert_eq!(parser.timestamp("2015-13-24T11:47:08Z stuff"), None);
    }

    #[test]
    fn test_source_extraction() {
        let parser = LineParser::new();
        assert_eq!(
            parser.source(&event_line("start")),
            Some("busybox:latest".to_string())
        );
        let bare = format!("2015-03-24T11:47:08.000000000-04:00 {}: destroy", CID);
        assert_eq!(parser.source(&bare), None);
    }

    #[test]
    fn test_operation_extraction() {
        let parser = LineParser::new();
        assert_eq!(parser.operation(&event_line("die")), Some("die".to_string()));
        assert_eq!(parser.operation("no trailing word "), None);
    }

    #[test]
    fn test_parse_line_requires_id_and_timestamp() {
        let parser = LineParser::new();

        let record = parser.parse_line(&event_line("create")).unwrap();
        assert_eq!(record.id, Identifier::ContainerId(CID.to_string()));
        assert_eq!(record.event.operation.as_deref(), Some("create"));
        assert_eq!(record.event.source.as_deref(), Some("busybox:latest"));

        // Identifier but no timestamp
        let no_ts = format!("garbage-prefix {}: (from busybox:latest) start", CID);
        assert!(parser.parse_line(&no_ts).is_none());

        // Timestamp but no identifier
        let no_id = "2015-03-24T11:47:08.000000000-04:00 ???: start";
        assert!(parser.parse_line(no_id).is_none());
    }

    #[test]
    fn test_parse_line_without_source_or_operation() {
        let parser = LineParser::new();
        // Trailing colon strips the operation match; source absent too
        let line = format!("2015-03-24T11:47:08.000000000-04:00 {}: -", CID);
        let record = parser.parse_line(&line).unwrap();
        assert_eq!(record.event.source, None);
        assert_eq!(record.event.operation, None);
    }
}
