//! Docker subprocess wrappers
//!
//! [`DockerCmd`] runs a docker subcommand synchronously and captures its
//! output. [`AsyncDockerCmd`] keeps a long-running subcommand (here:
//! `docker events`) alive while a reader thread accumulates its stdout;
//! stopping it is a hard deadline, not a graceful shutdown - whatever text
//! arrived by the deadline is what the caller gets.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Captured outcome of one synchronous docker invocation
#[derive(Debug, Clone)]
pub struct CmdResult {
    /// The command line that was run, for diagnostics
    pub command: String,
    /// Process exit code, None if terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    /// True when the process exited zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Turn a non-zero exit into an error carrying command line and stderr
pub fn must_pass(result: CmdResult) -> Result<CmdResult> {
    if result.success() {
        Ok(result)
    } else {
        bail!(
            "command '{}' failed (exit {:?}): {}",
            result.command,
            result.exit_code,
            result.stderr.trim()
        );
    }
}

/// A synchronous docker command (e.g. `docker run ...`)
#[derive(Debug, Clone)]
pub struct DockerCmd {
    binary: String,
    subcommand: String,
    args: Vec<String>,
}

impl DockerCmd {
    pub fn new(binary: &str, subcommand: &str, args: Vec<String>) -> Self {
        Self {
            binary: binary.to_string(),
            subcommand: subcommand.to_string(),
            args,
        }
    }

    /// The full command line, for logging and error messages
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.binary.clone(), self.subcommand.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion, capturing stdout and stderr
    pub fn execute(&self) -> Result<CmdResult> {
        log::debug!("executing: {}", self.command_line());
        let output = Command::new(&self.binary)
            .arg(&self.subcommand)
            .args(&self.args)
            .output()
            .with_context(|| format!("failed to spawn '{}'", self.command_line()))?;
        Ok(CmdResult {
            command: self.command_line(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A long-running docker command with continuous stdout capture
pub struct AsyncDockerCmd {
    command: String,
    child: Child,
    stdout_buf: Arc<Mutex<String>>,
    reader: Option<thread::JoinHandle<()>>,
}

impl AsyncDockerCmd {
    /// Spawn the command and start accumulating its stdout
    pub fn spawn(binary: &str, subcommand: &str, args: Vec<String>) -> Result<Self> {
        let command = {
            let mut parts = vec![binary.to_string(), subcommand.to_string()];
            parts.extend(args.iter().cloned());
            parts.join(" ")
        };
        log::debug!("spawning: {}", command);
        let mut child = Command::new(binary)
            .arg(subcommand)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", command))?;
        let mut stdout = child
            .stdout
            .take()
            .context("child process stdout unavailable")?;
        let stdout_buf = Arc::new(Mutex::new(String::new()));
        let reader_buf = Arc::clone(&stdout_buf);
        let reader = thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stdout.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&chunk[..n]).into_owned();
                        if let Ok(mut buf) = reader_buf.lock() {
                            buf.push_str(&text);
                        }
                    }
                }
            }
        });
        Ok(Self {
            command,
            child,
            stdout_buf,
            reader: Some(reader),
        })
    }

    /// Snapshot of the output accumulated so far
    pub fn output_so_far(&self) -> String {
        self.stdout_buf
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Stop the command and return everything captured
    ///
    /// Waits up to `grace` for the process to exit on its own, then kills
    /// it. There is no retry: text produced after the deadline is lost by
    /// design.
    pub fn stop(mut self, grace: Duration) -> Result<String> {
        let deadline = Instant::now() + grace;
        loop {
            let status = self
                .child
                .try_wait()
                .with_context(|| format!("failed to poll '{}'", self.command))?;
            if status.is_some() {
                break;
            }
            if Instant::now() >= deadline {
                log::debug!("killing '{}' after {:?} grace", self.command, grace);
                let _ = self.child.kill();
                let _ = self.child.wait();
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
        if let Some(reader) = self.reader.take() {
            // Reader exits once the child's stdout closes
            let _ = reader.join();
        }
        let captured = self.output_so_far();
        log::debug!("captured {} bytes from '{}'", captured.len(), self.command);
        Ok(captured)
    }
}
