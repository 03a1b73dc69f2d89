//! Subtest lifecycle: initialize, run_once, postprocess, cleanup
//!
//! Drives one full conformance run: start capturing `docker events`, run a
//! short-lived container to completion, tear it down, then reconcile the
//! captured stream against the expected operation set. The actual checking
//! logic is the pure [`check_events`] function so it can be exercised
//! without a docker daemon.

use crate::config::HarnessConfig;
use crate::docker::{must_pass, AsyncDockerCmd, DockerCmd};
use crate::report::CheckReport;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use docker_events_parser::{
    reconcile, EventIndex, Identifier, ParserError, StreamParser, CONTAINER_ID_LEN,
};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Shortest plausible capture: roughly one event line
const MIN_CAPTURE_LEN: usize = 80;

/// Grace period before the capture process is killed
const CAPTURE_STOP_GRACE: Duration = Duration::from_secs(1);

/// Reasons the event check itself can fail
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("captured events output too short: '{0}'")]
    OutputTooShort(String),

    #[error("test container cid {0} does not appear in events")]
    CidMissing(String),

    #[error("expected event operation(s) {leftover:?} for cid {cid} not found")]
    MissingExpectedOperations { cid: String, leftover: Vec<String> },

    #[error("{count} event operation(s) outside the expected set observed for cid {cid}")]
    UnexpectedOperations { cid: String, count: usize },

    #[error(transparent)]
    Parse(#[from] ParserError),
}

/// Reconcile captured event text against the expected operations for `cid`
///
/// Runs the whole core pipeline: parse (unlimited tolerance), aggregate,
/// reconcile, then a second parse bounded by `unparseable_allowance` so a
/// garbage-heavy capture fails even when the expected events were all
/// found. Unexpected operations are logged for visibility; they only fail
/// the check when `fail_on_unexpected` is set.
pub fn check_events(
    captured: &str,
    cid: &str,
    expected: &[String],
    unparseable_allowance: usize,
    fail_on_unexpected: bool,
) -> std::result::Result<CheckReport, CheckError> {
    let stdout = captured.trim();
    if stdout.len() < MIN_CAPTURE_LEN {
        return Err(CheckError::OutputTooShort(stdout.to_string()));
    }
    let records = StreamParser::unlimited().parse(stdout)?;
    let mut index = EventIndex::new();
    index.merge(records);

    let id = Identifier::ContainerId(cid.to_string());
    let events = index
        .events(&id)
        .ok_or_else(|| CheckError::CidMissing(cid.to_string()))?;

    let result = reconcile(events, expected);
    for event in &result.unexpected {
        log::warn!("untested event for cid {}: {:?}", cid, event);
    }
    if !result.all_accounted() {
        return Err(CheckError::MissingExpectedOperations {
            cid: cid.to_string(),
            leftover: result.leftover,
        });
    }
    if fail_on_unexpected && !result.unexpected.is_empty() {
        return Err(CheckError::UnexpectedOperations {
            cid: cid.to_string(),
            count: result.unexpected.len(),
        });
    }
    log::info!("all expected events were located for cid {}", cid);

    // Fail on excess unparseable garbage
    StreamParser::new(Some(unparseable_allowance)).parse(stdout)?;

    Ok(CheckReport {
        cid: cid.to_string(),
        expected: expected.to_vec(),
        observed: events.to_vec(),
        unexpected: result.unexpected,
    })
}

/// Extract the container id `docker run --detach` prints on stdout
///
/// Anything other than a full 64-hex id (an empty string from a
/// non-detached run, an error banner) fails here instead of surfacing
/// later as a missing cid.
fn cid_from_run_output(stdout: &str) -> Result<String> {
    let cid = stdout.trim();
    let is_hex = cid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if cid.len() != CONTAINER_ID_LEN || !is_hex {
        bail!("docker run did not return a container id: '{}'", cid);
    }
    Ok(cid.to_string())
}

/// One conformance run around a single test container
pub struct EventsSubtest {
    config: HarnessConfig,
    /// Unique container name for this run
    name: String,
    /// Per-step progress messages, built per instance
    step_messages: [(&'static str, String); 4],
    /// Container id recorded once `docker run` returns
    cid: Option<String>,
}

/// Per-process sequence number so names stay unique within one millisecond
static NAME_SEQ: AtomicU64 = AtomicU64::new(0);

impl EventsSubtest {
    pub fn new(config: HarnessConfig) -> Self {
        let name = format!(
            "docker_events_{}_{}_{}",
            process::id(),
            Utc::now().timestamp_millis(),
            NAME_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let step_messages = [
            ("initialize", format!("preparing test container '{}'", name)),
            ("run_once", format!("capturing events around '{}'", name)),
            ("postprocess", "reconciling captured events".to_string()),
            ("cleanup", "removing test container".to_string()),
        ];
        Self {
            config,
            name,
            step_messages,
            cid: None,
        }
    }

    fn log_step(&self, step: usize) {
        let (name, message) = &self.step_messages[step];
        log::info!("[{}] {}", name, message);
    }

    /// Execute the full lifecycle; cleanup always runs
    pub fn run(&mut self) -> Result<CheckReport> {
        self.log_step(0);
        let expected = self.config.expected_operations();
        let run_args = self.config.rendered_run_args(&self.name);
        log::debug!("expected operations: {:?}", expected);
        log::debug!("run arguments: {:?}", run_args);

        let outcome = self.run_once(run_args).and_then(|captured| {
            self.log_step(2);
            let cid = self.cid.as_deref().context("container id never recorded")?;
            let report = check_events(
                &captured,
                cid,
                &expected,
                self.config.unparseable_allowance,
                self.config.fail_on_unexpected,
            )?;
            Ok(report)
        });
        if let Err(err) = self.cleanup() {
            log::warn!("cleanup failed: {:#}", err);
        }
        outcome
    }

    /// Start capture, run the container to completion, stop capture
    fn run_once(&mut self, run_args: Vec<String>) -> Result<String> {
        self.log_step(1);
        let binary = self.config.docker_binary.clone();

        // Start listening before anything can emit events
        let capture = AsyncDockerCmd::spawn(&binary, "events", vec!["--since=0".to_string()])?;

        // Do something to make new events
        let run_result = must_pass(DockerCmd::new(&binary, "run", run_args).execute()?)?;
        let cid = cid_from_run_output(&run_result.stdout)?;
        self.cid = Some(cid.clone());

        while self.container_running(&cid)? {
            log::info!("waiting for test container to exit...");
            thread::sleep(Duration::from_secs(self.config.poll_interval));
        }

        if self.config.rm_after_run {
            log::info!("removing test container...");
            // The container has already exited; a failed kill is fine
            let _ = DockerCmd::new(&binary, "kill", vec![cid.clone()]).execute();
            must_pass(
                DockerCmd::new(
                    &binary,
                    "rm",
                    vec!["--force".to_string(), "--volumes".to_string(), cid.clone()],
                )
                .execute()?,
            )?;
        }

        // No way to know how long async events take to pass through
        log::info!(
            "sleeping {} seconds for events to catch up",
            self.config.wait_stop
        );
        thread::sleep(Duration::from_secs(self.config.wait_stop));

        capture.stop(CAPTURE_STOP_GRACE)
    }

    /// Query `docker inspect` for the container's running state
    ///
    /// A failed inspect means the container is already gone, which counts
    /// as not running.
    fn container_running(&self, cid: &str) -> Result<bool> {
        let result =
            DockerCmd::new(&self.config.docker_binary, "inspect", vec![cid.to_string()])
                .execute()?;
        if !result.success() {
            return Ok(false);
        }
        let parsed: serde_json::Value = serde_json::from_str(result.stdout.trim())
            .context("malformed docker inspect output")?;
        Ok(parsed
            .get(0)
            .and_then(|container| container.pointer("/State/Running"))
            .and_then(|running| running.as_bool())
            .unwrap_or(false))
    }

    /// Force-remove the test container when configured to
    fn cleanup(&mut self) -> Result<()> {
        self.log_step(3);
        if !self.config.remove_after_test {
            return Ok(());
        }
        if let Some(cid) = &self.cid {
            let result = DockerCmd::new(
                &self.config.docker_binary,
                "rm",
                vec!["--force".to_string(), "--volumes".to_string(), cid.clone()],
            )
            .execute()?;
            if !result.success() {
                log::debug!("cleanup rm exited {:?}: {}", result.exit_code, result.stderr.trim());
            }
        }
        Ok(())
    }
}
