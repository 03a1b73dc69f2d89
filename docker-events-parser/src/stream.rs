//! Multi-line stream parsing with noise tolerance
//!
//! Drives [`LineParser`] over a captured text blob, counting the lines that
//! failed to yield a record ("noise"). An optional tolerance bounds how much
//! noise is acceptable before the whole parse is abandoned.

use crate::line::LineParser;
use crate::types::{ParsedRecord, ParserError, Result, CONTAINER_ID_LEN};

/// Parses a whole captured event stream, enforcing a noise threshold
pub struct StreamParser {
    line_parser: LineParser,
    /// Maximum allowed noise lines; None disables the check
    tolerance: Option<usize>,
}

impl StreamParser {
    /// Create a parser that tolerates at most `tolerance` noise lines
    pub fn new(tolerance: Option<usize>) -> Self {
        Self {
            line_parser: LineParser::new(),
            tolerance,
        }
    }

    /// Create a parser with no noise limit
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Parse `text` line by line, preserving appearance order
    ///
    /// Lines shorter than a container id are classified as noise without
    /// invoking field extraction. The noise count is checked against the
    /// tolerance after every failed line; the first excess aborts the parse
    /// with [`ParserError::ToleranceExceeded`]. Successful records come back
    /// in the order their lines appeared, which is assumed but not verified
    /// to be chronological.
    pub fn parse(&self, text: &str) -> Result<Vec<ParsedRecord>> {
        let mut records = Vec::new();
        let mut noise: Vec<String> = Vec::new();
        let mut lines_processed = 0usize;
        for line in text.lines() {
            lines_processed += 1;
            if line.len() < CONTAINER_ID_LEN {
                // Cannot possibly hold an identifier
                noise.push(line.to_string());
            } else if let Some(record) = self.line_parser.parse_line(line) {
                records.push(record);
                continue;
            } else {
                log::trace!("unparseable event line: {}", line);
                noise.push(line.to_string());
            }
            if let Some(tolerance) = self.tolerance {
                if noise.len() > tolerance {
                    return Err(ParserError::ToleranceExceeded {
                        tolerance,
                        lines_processed,
                        parsed: records.len(),
                        noise,
                    });
                }
            }
        }
        log::debug!(
            "parsed {} events from {} lines ({} noise)",
            records.len(),
            lines_processed,
            noise.len()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identifier;

    const CID: &str = "4386fb97867d2b4027c5cdb1744b1e2e8e5b0d1f15b2d3f2b1c8b8b8b8b8b8b8";

    fn event_line(op: &str) -> String {
        format!(
            "2015-03-24T11:47:08.000000000-04:00 {}: (from busybox:latest) {}",
            CID, op
        )
    }

    /// A line long enough to reach field extraction but still unusable
    fn long_garbage() -> String {
        "x".repeat(CONTAINER_ID_LEN + 16)
    }

    #[test]
    fn test_short_lines_are_noise_without_extraction() {
        // 20 garbage characters followed by one good line, tolerance 1
        let text = format!("{}\n{}\n", "g".repeat(20), event_line("die"));
        let records = StreamParser::new(Some(1)).parse(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, Identifier::ContainerId(CID.to_string()));
        assert_eq!(records[0].event.operation.as_deref(), Some("die"));
    }

    #[test]
    fn test_appearance_order_preserved() {
        let text = format!("{}\n{}\n{}\n", event_line("create"), event_line("start"), event_line("die"));
        let records = StreamParser::unlimited().parse(&text).unwrap();
        let ops: Vec<_> = records
            .iter()
            .map(|r| r.event.operation.as_deref().unwrap())
            .collect();
        assert_eq!(ops, vec!["create", "start", "die"]);
    }

    #[test]
    fn test_tolerance_boundary_exact() {
        // Exactly k noise lines with tolerance k parses successfully
        let k = 3;
        let mut text = String::new();
        for _ in 0..k {
            text.push_str(&long_garbage());
            text.push('\n');
        }
        text.push_str(&event_line("start"));
        text.push('\n');
        let records = StreamParser::new(Some(k)).parse(&text).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_tolerance_exceeded_by_one() {
        let text = format!(
            "{}\n{}\n{}\n{}\n",
            long_garbage(),
            long_garbage(),
            event_line("start"),
            long_garbage()
        );
        let err = StreamParser::new(Some(2)).parse(&text).unwrap_err();
        match err {
            ParserError::ToleranceExceeded {
                tolerance,
                lines_processed,
                parsed,
                noise,
            } => {
                assert_eq!(tolerance, 2);
                assert_eq!(lines_processed, 4);
                assert_eq!(parsed, 1);
                assert_eq!(noise.len(), 3);
            }
        }
    }

    #[test]
    fn test_abort_is_immediate() {
        // The good line after the third garbage line is never reached
        let text = format!(
            "{}\n{}\n{}\n{}\n",
            long_garbage(),
            long_garbage(),
            long_garbage(),
            event_line("start")
        );
        let err = StreamParser::new(Some(2)).parse(&text).unwrap_err();
        match err {
            ParserError::ToleranceExceeded {
                lines_processed,
                parsed,
                ..
            } => {
                assert_eq!(lines_processed, 3);
                assert_eq!(parsed, 0);
            }
        }
    }

    #[test]
    fn test_no_tolerance_never_fails() {
        let mut text = String::new();
        for _ in 0..100 {
            text.push_str(&long_garbage());
            text.push('\n');
        }
        let records = StreamParser::unlimited().parse(&text).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_zero_tolerance() {
        let good = format!("{}\n", event_line("create"));
        assert_eq!(StreamParser::new(Some(0)).parse(&good).unwrap().len(), 1);
        let noisy = format!("{}\nshort\n", event_line("create"));
        assert!(StreamParser::new(Some(0)).parse(&noisy).is_err());
    }
}
