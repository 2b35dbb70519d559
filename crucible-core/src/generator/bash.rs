//! Bash generator execution.
//!
//! The script is staged into a temporary file with a strict-mode preamble
//! and run under `/bin/bash` with the minimized environment from the parent
//! module. Output is parsed strictly as `key=value` lines; a non-zero exit
//! discards the whole generator (no partial key capture).

use std::collections::HashMap;
use std::io::Write;

use super::{run_interpreter, GeneratorError};

pub(crate) async fn run(
    script: &str,
    timeout_secs: u64,
) -> Result<HashMap<String, String>, GeneratorError> {
    // NamedTempFile removes the script on drop, on every exit path.
    let mut file = tempfile::Builder::new()
        .prefix("crucible-gen-")
        .suffix(".sh")
        .tempfile()?;
    writeln!(file, "#!/bin/bash")?;
    writeln!(file, "set -euo pipefail")?;
    file.write_all(script.as_bytes())?;
    file.flush()?;

    let output = run_interpreter("/bin/bash", &[file.path().as_os_str()], timeout_secs).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GeneratorError::ScriptFailed(stderr.trim().to_string()));
    }

    Ok(parse_key_value_lines(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

/// Parse `key=value` lines; lines without `=` or starting with `#` are
/// ignored.
fn parse_key_value_lines(stdout: &str) -> HashMap<String, String> {
    let mut placeholders = HashMap::new();
    for line in stdout.lines() {
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            placeholders.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    placeholders
}
