//! Checker executable discovery and `check-contents` invocation.
//!
//! The checker is invoked once per call with the source text on stdin and a
//! virtual file path, and produces a JSON diagnostic report on stdout. The
//! invocation carries a bounded timeout; on expiry the process is killed and
//! reaped. A non-zero exit status with parseable output is
//! success-with-diagnostics, not a failure.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::probe::ProbeCache;
use crate::report::FlowReport;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one checker invocation.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a project-local checker binary lives, relative to the root dir.
const FLOW_RELATIVE_PATH: &str = "node_modules/.bin/flow";

// ============================================================================
// Error Types
// ============================================================================

/// Errors at the checker process boundary.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No checker executable could be located.
    #[error("flow executable not found: no {relative} under the root dir and no `flow` on PATH")]
    MissingExecutable { relative: String },

    /// The checker process failed to start.
    #[error("failed to spawn flow checker: {reason}")]
    SpawnFailed { reason: String },

    /// The checker did not finish within the timeout.
    #[error("flow check timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The checker's output was not a valid diagnostic report.
    #[error("unparsable flow output: {reason}")]
    OutputParse { reason: String },

    /// IO error while talking to the checker.
    #[error("IO error talking to flow: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

// ============================================================================
// Executable Discovery
// ============================================================================

/// Locate the checker executable for a project.
///
/// Prefers the project-local `node_modules/.bin/flow`; falls back to `flow`
/// on PATH.
pub fn find_flow_executable(root_dir: &Path) -> OracleResult<PathBuf> {
    let local = root_dir.join(FLOW_RELATIVE_PATH);
    if local.is_file() {
        return Ok(local);
    }
    which::which("flow").map_err(|_| OracleError::MissingExecutable {
        relative: FLOW_RELATIVE_PATH.to_string(),
    })
}

// ============================================================================
// Client
// ============================================================================

/// Handle to a project's checker: executable path, root dir, timeout, and
/// the probe cache shared by all probes through this client.
#[derive(Debug)]
pub struct FlowClient {
    flow_bin: PathBuf,
    root_dir: PathBuf,
    timeout: Duration,
    pub(crate) probe_cache: ProbeCache,
}

impl FlowClient {
    /// Create a client for the project rooted at `root_dir`, discovering the
    /// checker executable.
    pub fn new(root_dir: impl Into<PathBuf>) -> OracleResult<Self> {
        let root_dir = root_dir.into();
        let flow_bin = find_flow_executable(&root_dir)?;
        Ok(FlowClient::with_executable(root_dir, flow_bin))
    }

    /// Create a client with an explicit checker executable.
    pub fn with_executable(root_dir: impl Into<PathBuf>, flow_bin: impl Into<PathBuf>) -> Self {
        FlowClient {
            flow_bin: flow_bin.into(),
            root_dir: root_dir.into(),
            timeout: DEFAULT_CHECK_TIMEOUT,
            probe_cache: ProbeCache::default(),
        }
    }

    /// Override the invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The project root the checker runs in.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Check `content` as if it lived at `file` (a root-relative path) and
    /// return the diagnostic report.
    pub fn check_contents(&self, file: &str, content: &str) -> OracleResult<FlowReport> {
        debug!(file, bytes = content.len(), "running flow check-contents");

        let mut child = Command::new(&self.flow_bin)
            .args(["check-contents", "--json", file])
            .current_dir(&self.root_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OracleError::SpawnFailed {
                reason: e.to_string(),
            })?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| OracleError::SpawnFailed {
                reason: "failed to capture checker stdin".to_string(),
            })?;
            // A checker that exits before draining stdin closes the pipe;
            // its output is still worth reading.
            if let Err(e) = stdin.write_all(content.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(OracleError::Io(e));
                }
            }
        }

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                let mut output = String::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout.read_to_string(&mut output)?;
                }
                if !status.success() {
                    debug!(code = ?status.code(), "checker exited non-zero (diagnostics expected)");
                }
                serde_json::from_str(&output).map_err(|e| OracleError::OutputParse {
                    reason: e.to_string(),
                })
            }
            None => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "flow check timed out, killing checker"
                );
                let _ = child.kill();
                let _ = child.wait();
                Err(OracleError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for the checker.
    fn write_fake_flow(dir: &Path, script_body: &str) -> PathBuf {
        let path = dir.join("flow");
        let script = format!("#!/bin/sh\n{script_body}\n");
        fs::write(&path, script).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn tolerates_non_zero_exit_with_valid_output() {
        let dir = TempDir::new().unwrap();
        let flow = write_fake_flow(
            dir.path(),
            "cat > /dev/null\necho '{\"errors\": []}'\nexit 2",
        );
        let client = FlowClient::with_executable(dir.path(), flow);
        let report = client.check_contents("src/main.js", "const x = 1;\n").unwrap();
        assert!(report.errors.is_empty());
    }

    #[test]
    fn unparsable_output_is_a_hard_failure() {
        let dir = TempDir::new().unwrap();
        let flow = write_fake_flow(dir.path(), "cat > /dev/null\necho 'not json'");
        let client = FlowClient::with_executable(dir.path(), flow);
        let err = client.check_contents("src/main.js", "").unwrap_err();
        assert!(matches!(err, OracleError::OutputParse { .. }));
    }

    #[test]
    fn hung_checker_is_killed_on_timeout() {
        let dir = TempDir::new().unwrap();
        let flow = write_fake_flow(dir.path(), "cat > /dev/null\nsleep 30");
        let client = FlowClient::with_executable(dir.path(), flow)
            .with_timeout(Duration::from_millis(200));
        let err = client.check_contents("src/main.js", "").unwrap_err();
        assert!(matches!(err, OracleError::Timeout { .. }));
    }

    #[test]
    fn prefers_project_local_executable() {
        let dir = TempDir::new().unwrap();
        let bin_dir = dir.path().join("node_modules/.bin");
        fs::create_dir_all(&bin_dir).unwrap();
        let local = write_fake_flow(&bin_dir, "echo '{\"errors\": []}'");
        assert_eq!(find_flow_executable(dir.path()).unwrap(), local);
    }

    #[test]
    fn missing_executable_is_reported() {
        // Only meaningful when no global checker is installed.
        if which::which("flow").is_ok() {
            eprintln!("Skipping test: flow found on PATH");
            return;
        }
        let dir = TempDir::new().unwrap();
        let err = find_flow_executable(dir.path()).unwrap_err();
        assert!(matches!(err, OracleError::MissingExecutable { .. }));
    }
}
