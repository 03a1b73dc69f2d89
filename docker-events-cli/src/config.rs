//! Harness configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Harness configuration (loaded from config.toml, overridable on the
/// command line)
///
/// Every instance owns its own copy; nothing here is shared or global.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
    /// Docker client binary to invoke
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    /// Fully-qualified image the test container runs
    #[serde(default = "default_image")]
    pub image: String,

    /// Comma-delimited `docker run` arguments; `$NAME` and `$IMAGE` are
    /// substituted, unknown placeholders are left alone
    #[serde(default = "default_run_args")]
    pub run_args: String,

    /// Comma-delimited operations the test container must produce
    #[serde(default = "default_expect_events")]
    pub expect_events: String,

    /// Seconds to wait for trailing events after the container is gone
    #[serde(default = "default_wait_stop")]
    pub wait_stop: u64,

    /// Seconds between container-state polls while waiting for exit
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Maximum unparseable lines tolerated in the captured stream
    #[serde(default = "default_unparseable_allowance")]
    pub unparseable_allowance: usize,

    /// Kill and remove the test container once it has exited
    #[serde(default = "default_true")]
    pub rm_after_run: bool,

    /// Force-remove the test container during cleanup
    #[serde(default = "default_true")]
    pub remove_after_test: bool,

    /// Treat operations outside the expected set as a failure
    /// (default: informational only)
    #[serde(default)]
    pub fail_on_unexpected: bool,
}

fn default_docker_binary() -> String {
    "docker".to_string()
}

fn default_image() -> String {
    "busybox:latest".to_string()
}

fn default_run_args() -> String {
    // Detached so `docker run` prints the container id, not /bin/true's
    // (empty) output; the harness records that id and polls it.
    "--detach,--name,$NAME,$IMAGE,/bin/true".to_string()
}

fn default_expect_events() -> String {
    "create,start,die,destroy".to_string()
}

fn default_wait_stop() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    3
}

fn default_unparseable_allowance() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            docker_binary: default_docker_binary(),
            image: default_image(),
            run_args: default_run_args(),
            expect_events: default_expect_events(),
            wait_stop: default_wait_stop(),
            poll_interval: default_poll_interval(),
            unparseable_allowance: default_unparseable_allowance(),
            rm_after_run: true,
            remove_after_test: true,
            fail_on_unexpected: false,
        }
    }
}

impl HarnessConfig {
    /// Expected operations as a list, whitespace trimmed, empties dropped
    pub fn expected_operations(&self) -> Vec<String> {
        split_csv(&self.expect_events)
    }

    /// Rendered `docker run` argument list for a concrete name and image
    pub fn rendered_run_args(&self, name: &str) -> Vec<String> {
        split_csv(&self.run_args)
            .into_iter()
            .map(|arg| render_template(&arg, name, &self.image))
            .collect()
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    let config: HarnessConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Split a comma-delimited config value into trimmed, non-empty items
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Substitute `$NAME` and `$IMAGE`; placeholders not in the mapping stay
/// as-is
///
/// A placeholder is `$` followed by a maximal run of identifier
/// characters, so `$NAMESPACE` is a distinct unknown placeholder, not
/// `$NAME` plus text.
pub fn render_template(arg: &str, name: &str, image: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        match &after[..end] {
            "NAME" => out.push_str(name),
            "IMAGE" => out.push_str(image),
            other => {
                out.push('$');
                out.push_str(other);
            }
        }
        rest = &after[end..];
    }
    out.push_str(rest);
    out
}
