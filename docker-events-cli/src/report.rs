//! Pass/fail report rendering
//!
//! The harness hands back a [`CheckReport`]; this module renders it as
//! human-readable text or JSON. Rendering never decides pass/fail - a
//! report only exists for runs whose check already passed, failures are
//! reported through errors.

use anyhow::Result;
use docker_events_parser::Event;
use serde::Serialize;

/// Summary of a successful event check for one container
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Full container id that was checked
    pub cid: String,
    /// Operations the caller required
    pub expected: Vec<String>,
    /// Every event observed for the container, in time order
    pub observed: Vec<Event>,
    /// Observed events whose operation was outside the expected set
    pub unexpected: Vec<Event>,
}

/// Render a multi-line text summary
pub fn render_text(report: &CheckReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("container: {}\n", report.cid));
    out.push_str(&format!("expected:  {}\n", report.expected.join(", ")));
    out.push_str(&format!("observed:  {} event(s)\n", report.observed.len()));
    for event in &report.observed {
        out.push_str(&format!(
            "  {} {}{}\n",
            event.timestamp.to_rfc3339(),
            event.operation.as_deref().unwrap_or("<none>"),
            event
                .source
                .as_deref()
                .map(|s| format!(" (from {})", s))
                .unwrap_or_default(),
        ));
    }
    if !report.unexpected.is_empty() {
        out.push_str(&format!(
            "untested:  {} event(s) outside the expected set\n",
            report.unexpected.len()
        ));
    }
    out.push_str("all expected events were located\n");
    out
}

/// Render the report as pretty-printed JSON
pub fn render_json(report: &CheckReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
