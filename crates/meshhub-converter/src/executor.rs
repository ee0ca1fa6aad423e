//! External tool execution.
//!
//! Resolves configured executables, spawns them as child processes with
//! both output streams captured, and maps their exit status onto
//! [`ConversionError`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::ConversionError;
use crate::metrics::ConversionMetrics;

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Availability of one configured executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Found and executable.
    Available,
    /// Not found.
    Missing,
    /// Found without execute permission.
    NotExecutable,
}

/// Availability report for one tool used by a pipeline component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAvailability {
    /// Component using the tool (e.g. `ifc`, `decimator`).
    pub component: String,
    /// Configured path or program name.
    pub configured: PathBuf,
    /// Resolved absolute path, when found.
    pub resolved: Option<PathBuf>,
    /// Status.
    pub status: ToolStatus,
}

impl ToolAvailability {
    /// Probe `configured` on behalf of `component`.
    pub fn probe(component: &str, configured: &Path) -> Self {
        let (resolved, status) = match ToolExecutor::resolve_program(configured) {
            Ok(path) => (Some(path), ToolStatus::Available),
            Err(ConversionError::ToolNotExecutable { path }) => {
                (Some(path), ToolStatus::NotExecutable)
            }
            Err(_) => (None, ToolStatus::Missing),
        };
        Self {
            component: component.to_string(),
            configured: configured.to_path_buf(),
            resolved,
            status,
        }
    }
}

/// Runs external tools with an optional time limit.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    timeout: Option<Duration>,
    metrics: Arc<ConversionMetrics>,
}

impl ToolExecutor {
    /// Create an executor. `None` means no time limit.
    pub fn new(timeout: Option<Duration>, metrics: Arc<ConversionMetrics>) -> Self {
        Self { timeout, metrics }
    }

    /// Resolve a configured executable.
    ///
    /// A bare program name is searched on `PATH`. Fails with
    /// `ToolUnavailable` when nothing is found and `ToolNotExecutable` when
    /// the file lacks execute permission.
    pub fn resolve_program(program: &Path) -> Result<PathBuf, ConversionError> {
        let is_bare = program.components().count() == 1 && !program.is_absolute();
        let candidate = if is_bare {
            std::env::var_os("PATH")
                .and_then(|paths| {
                    std::env::split_paths(&paths)
                        .map(|dir| dir.join(program))
                        .find(|p| p.is_file())
                })
                .ok_or_else(|| ConversionError::ToolUnavailable {
                    path: program.to_path_buf(),
                })?
        } else {
            program.to_path_buf()
        };

        let metadata =
            std::fs::metadata(&candidate).map_err(|_| ConversionError::ToolUnavailable {
                path: candidate.clone(),
            })?;

        if !metadata.is_file() || !is_executable(&metadata) {
            return Err(ConversionError::ToolNotExecutable { path: candidate });
        }

        Ok(candidate)
    }

    /// Run `program` with `args` in `cwd`, draining both output streams
    /// until exit.
    ///
    /// Non-zero exit maps to `ToolExecutionFailed` with the captured stderr;
    /// signal termination to `ToolKilled`; exceeding the time limit kills
    /// the child and maps to `ToolTimeout`.
    pub async fn run(
        &self,
        tool: &str,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
    ) -> Result<ToolOutput, ConversionError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(tool, program = %program.display(), ?args, "Spawning tool");

        let start = Instant::now();
        let child = cmd.spawn()?;
        self.metrics.record_spawn();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it.
                    error!(tool, timeout_s = limit.as_secs(), "Tool timed out, killed");
                    return Err(ConversionError::ToolTimeout {
                        tool: tool.to_string(),
                        timeout_seconds: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await?,
        };

        let elapsed = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !stdout.is_empty() {
            debug!(tool, stdout = %stdout, "Tool stdout");
        }

        if output.status.success() {
            info!(tool, elapsed_ms = elapsed.as_millis() as u64, "Tool completed");
            return Ok(ToolOutput {
                stdout,
                stderr,
                elapsed,
            });
        }

        match output.status.code() {
            Some(code) => {
                error!(
                    tool,
                    code,
                    elapsed_ms = elapsed.as_millis() as u64,
                    stderr = %stderr,
                    "Tool failed"
                );
                Err(ConversionError::ToolExecutionFailed {
                    tool: tool.to_string(),
                    code,
                    stderr: stderr.trim_end().to_string(),
                })
            }
            None => {
                error!(tool, "Tool terminated by signal");
                Err(ConversionError::ToolKilled {
                    tool: tool.to_string(),
                })
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn executor(timeout: Option<Duration>) -> (ToolExecutor, Arc<ConversionMetrics>) {
        let metrics = Arc::new(ConversionMetrics::new());
        (ToolExecutor::new(timeout, metrics.clone()), metrics)
    }

    #[test]
    fn test_resolve_missing_tool() {
        let err = ToolExecutor::resolve_program(Path::new("/nonexistent/IfcConvert")).unwrap_err();
        assert!(matches!(err, ConversionError::ToolUnavailable { .. }));
    }

    #[test]
    fn test_resolve_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "tool", "exit 0", 0o644);
        let err = ToolExecutor::resolve_program(&path).unwrap_err();
        assert!(matches!(err, ConversionError::ToolNotExecutable { .. }));
    }

    #[test]
    fn test_resolve_bare_name_on_path() {
        let resolved = ToolExecutor::resolve_program(Path::new("sh")).unwrap();
        assert!(resolved.is_absolute());
    }

    #[tokio::test]
    async fn test_run_captures_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            dir.path(),
            "tool",
            "echo 'unsupported shell topology' >&2\nexit 2",
            0o755,
        );
        let (exec, metrics) = executor(None);
        let err = exec.run("tool", &path, &[], dir.path()).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.stderr(), Some("unsupported shell topology"));
        assert_eq!(metrics.snapshot().tools_spawned, 1);
    }

    #[tokio::test]
    async fn test_run_passes_args_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "tool", "echo \"$@\"", 0o755);
        let (exec, _) = executor(None);
        let args = vec![OsString::from("-i"), OsString::from("a b"), OsString::from("0.6")];
        let out = exec.run("tool", &path, &args, dir.path()).await.unwrap();
        assert_eq!(out.stdout.trim_end(), "-i a b 0.6");
    }

    #[tokio::test]
    async fn test_run_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "tool", "sleep 5", 0o755);
        let (exec, _) = executor(Some(Duration::from_millis(200)));
        let err = exec.run("tool", &path, &[], dir.path()).await.unwrap_err();
        assert!(matches!(err, ConversionError::ToolTimeout { .. }));
    }
}
