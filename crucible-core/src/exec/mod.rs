//! Process execution - spawns validated commands and captures their outcome.
//!
//! Policy and mechanism are separated: callers are expected to have obtained
//! an allowed [`SecurityDecision`] before reaching this module, and the
//! runner does not re-validate. The one defensive floor it keeps is refusing
//! to spawn an empty command.
//!
//! Every failure mode - spawn errors, non-zero exits, timeouts - is reported
//! as an [`ExecutionOutcome`], never as an `Err`. Partial success is the
//! normal case for templates with several independent fragments, so outcomes
//! are data.
//!
//! [`SecurityDecision`]: crate::policy::SecurityDecision

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// The result of running one command fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// True iff the process exited with status 0
    pub success: bool,

    /// Captured standard output (lossy UTF-8)
    pub stdout: String,

    /// Captured standard error, or a synthesized failure message
    pub stderr: String,

    /// The alternative command that produced this outcome, if the original
    /// failed and a fallback succeeded
    pub used_fallback: Option<String>,
}

impl ExecutionOutcome {
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stderr: stderr.into(),
            ..Self::default()
        }
    }
}

/// Seam for command execution.
///
/// The renderer only ever talks to this trait, so tests can substitute an
/// instrumented stub and production code gets [`ShellRunner`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, working_dir: &Path, timeout_secs: u64) -> ExecutionOutcome;
}

/// Runs commands through `sh -c` with a wall-clock timeout.
///
/// A shell is required because fragments may contain pipes and redirects.
/// The child is placed in its own process group so that a timeout kills the
/// whole tree, not just the immediate shell.
#[derive(Debug, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, working_dir: &Path, timeout_secs: u64) -> ExecutionOutcome {
        if command.trim().is_empty() {
            return ExecutionOutcome::failure("refused to execute empty command");
        }

        debug!(command, timeout_secs, "executing command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return ExecutionOutcome::failure(format!("Error executing command: {err}"));
            }
        };
        let pid = child.id();

        match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
        {
            Ok(Ok(output)) => ExecutionOutcome {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                used_fallback: None,
            },
            Ok(Err(err)) => ExecutionOutcome::failure(format!("Error executing command: {err}")),
            Err(_) => {
                warn!(command, timeout_secs, "command timed out, killing process group");
                kill_process_group(pid);
                ExecutionOutcome::failure(format!(
                    "Command timed out after {timeout_secs} seconds"
                ))
            }
        }
    }
}

/// Kill the process group rooted at `pid` with SIGKILL.
///
/// The child was spawned with `process_group(0)`, so its pid doubles as the
/// group id. The orphaned child handle is reaped by the runtime afterwards.
#[cfg(unix)]
pub(crate) fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: killpg on a stale pgid at worst signals nothing.
        unsafe {
            libc::killpg(pid as i32, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        PathBuf::from(".")
    }

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let outcome = ShellRunner.run("echo hello", &cwd(), 5).await;
        assert!(outcome.success);
        assert_eq!(outcome.stdout.trim(), "hello");
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure() {
        let outcome = ShellRunner.run("exit 3", &cwd(), 5).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn missing_binary_is_an_outcome_not_an_error() {
        let outcome = ShellRunner
            .run("definitely-not-a-real-binary-1f2e3d", &cwd(), 5)
            .await;
        assert!(!outcome.success);
        assert!(!outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn empty_command_is_refused_without_spawning() {
        let outcome = ShellRunner.run("   ", &cwd(), 5).await;
        assert!(!outcome.success);
        assert_eq!(outcome.stderr, "refused to execute empty command");
    }

    #[tokio::test]
    async fn pipes_work_through_the_shell() {
        let outcome = ShellRunner.run("printf 'a\\nb\\nc\\n' | wc -l", &cwd(), 5).await;
        assert!(outcome.success);
        assert_eq!(outcome.stdout.trim(), "3");
    }

    #[tokio::test]
    async fn runs_in_the_given_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ShellRunner.run("pwd", dir.path(), 5).await;
        assert!(outcome.success);
        let reported = PathBuf::from(outcome.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
