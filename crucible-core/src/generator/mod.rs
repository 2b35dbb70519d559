//! Placeholder generators - small user-authored scripts that produce extra
//! key/value placeholders before the main render pass.
//!
//! Execution is best effort: each generator runs in isolation and a failure
//! is logged and skipped, never escalated to the render call. The two
//! supported interpreters keep deliberately different restriction
//! strategies - Python is confined at the language level (curated builtins
//! and module facades, enforced by an embedded driver), Bash at the OS
//! level (minimized environment, strict mode). The strategies are not
//! interchangeable and are maintained independently.

mod bash;
mod python;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::exec::kill_process_group;

/// Interpreter for a generator script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorLanguage {
    Python,
    Bash,
}

/// A generator script carried by a template. Treated as an opaque,
/// untrusted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub language: GeneratorLanguage,
    pub script: String,
}

/// Why a single generator failed. Consumed by [`PlaceholderGeneratorExecutor::execute`],
/// which logs and drops these - they never propagate to the caller.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("failed to stage generator script: {0}")]
    Io(#[from] std::io::Error),

    #[error("generator timed out after {0} seconds")]
    Timeout(u64),

    #[error("generator script failed: {0}")]
    ScriptFailed(String),

    #[error("generator produced invalid output: {0}")]
    BadOutput(String),
}

/// Runs generator scripts and collects the placeholders they produce.
pub struct PlaceholderGeneratorExecutor {
    timeout_secs: u64,
}

impl PlaceholderGeneratorExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Execute every generator and merge their placeholder maps.
    ///
    /// A failing generator contributes nothing; later generators overwrite
    /// earlier ones on key collision.
    pub async fn execute(&self, generators: &[GeneratorSpec]) -> HashMap<String, String> {
        let mut placeholders = HashMap::new();

        for generator in generators {
            match self.execute_one(generator).await {
                Ok(generated) => {
                    debug!(
                        language = ?generator.language,
                        count = generated.len(),
                        "generator produced placeholders"
                    );
                    placeholders.extend(generated);
                }
                Err(err) => {
                    warn!(
                        language = ?generator.language,
                        "placeholder generator failed: {err}"
                    );
                }
            }
        }

        placeholders
    }

    async fn execute_one(
        &self,
        generator: &GeneratorSpec,
    ) -> Result<HashMap<String, String>, GeneratorError> {
        match generator.language {
            GeneratorLanguage::Python => python::run(&generator.script, self.timeout_secs).await,
            GeneratorLanguage::Bash => bash::run(&generator.script, self.timeout_secs).await,
        }
    }
}

/// Spawn an interpreter with a minimized environment and the shared timeout
/// discipline.
///
/// The environment is cleared down to `PATH`, `HOME=/tmp`, and `SHELL`; the
/// child runs in the process's current working directory, in its own
/// process group so a timeout kills the whole tree.
pub(crate) async fn run_interpreter(
    program: &str,
    args: &[&OsStr],
    timeout_secs: u64,
) -> Result<std::process::Output, GeneratorError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .env("PATH", "/usr/bin:/bin")
        .env("HOME", "/tmp")
        .env("SHELL", "/bin/bash")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn()?;
    let pid = child.id();

    match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => {
            warn!(program, timeout_secs, "generator timed out, killing process group");
            kill_process_group(pid);
            Err(GeneratorError::Timeout(timeout_secs))
        }
    }
}
