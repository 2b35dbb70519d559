//! Fallback advisor - alternative commands and remediation hints for
//! failed executions.
//!
//! This is a stateless rule table keyed on the base command and on
//! case-insensitive substrings of the error text. It is advisory only:
//! every suggested alternative goes through the same policy validation as
//! the original command before the renderer will run it.

/// An alternative command to retry, with a human-readable reason.
pub type Alternative = (String, String);

/// Propose an ordered list of alternative commands for a failed one.
///
/// The renderer tries these in order and stops at the first success.
pub fn suggest_alternatives(command: &str, error: &str) -> Vec<Alternative> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    let Some(&base) = parts.first() else {
        return Vec::new();
    };
    let rest = parts[1..].join(" ");
    let error_lower = error.to_lowercase();
    let not_found =
        error_lower.contains("command not found") || error_lower.contains("not found");

    let mut alternatives = Vec::new();
    let mut push = |cmd: String, reason: &str| {
        alternatives.push((cmd.trim_end().to_string(), reason.to_string()));
    };

    if base == "python" && not_found {
        push(
            format!("python3 {rest}"),
            "python3 commonly used instead of python",
        );
        push(format!("python3.12 {rest}"), "trying specific Python version");
        push(format!("python3.11 {rest}"), "trying specific Python version");
        push(format!("/usr/bin/python3 {rest}"), "using full path");
    }

    if base == "git" {
        if error_lower.contains("not a git repository") {
            push(
                "find . -name '.git' -type d 2>/dev/null | head -1".to_string(),
                "finding git repositories",
            );
            push(
                "ls -la".to_string(),
                "showing directory contents to understand structure",
            );
        } else if error_lower.contains("unknown revision") {
            push("git status".to_string(), "checking repository status");
            push("git branch -a".to_string(), "listing all branches");
        }
    }

    if (base == "node" || base == "npm") && error_lower.contains("command not found") {
        push(
            "which node || which nodejs".to_string(),
            "checking for Node.js installation",
        );
        push(
            "ls /usr/local/bin/node* 2>/dev/null || echo 'Node.js not found'".to_string(),
            "looking for Node.js binaries",
        );
    }

    if base == "docker" && error_lower.contains("command not found") {
        push(
            "which docker || echo 'Docker not installed'".to_string(),
            "checking Docker installation",
        );
        push(format!("podman {rest}"), "trying Podman as alternative");
    }

    if not_found {
        push(
            format!("which {base} || echo 'Command {base} not found in PATH'"),
            "checking if command exists",
        );
        push(format!("whereis {base}"), "finding command location");
        push("echo $PATH".to_string(), "showing current PATH");
    }

    if error_lower.contains("permission denied") {
        push(
            format!("ls -la $(which {base} 2>/dev/null || echo '/usr/bin/{base}')"),
            "checking command permissions",
        );
    }

    alternatives
}

/// Format a failed command's error text with up to three ranked
/// remediation hints.
///
/// Produces `[ERROR: ...]` alone, or `[ERROR: ...]\n[Suggestions: ...]`
/// with bullet points when a known failure shape is recognized.
pub fn format_error(command: &str, error: &str) -> String {
    let base = command.split_whitespace().next().unwrap_or("");
    let error_clean = error.trim();
    let error_lower = error.to_lowercase();

    let suggestions: Vec<String> = if error_lower.contains("not a git repository") {
        vec![
            "Run this command from within a git repository".to_string(),
            "Initialize git with: git init".to_string(),
            "Check current directory with: pwd".to_string(),
        ]
    } else if error_lower.contains("command not found") && base == "python" {
        vec![
            "Try using 'python3' instead of 'python'".to_string(),
            "Install Python: brew install python (macOS) or apt-get install python3 (Linux)"
                .to_string(),
            "Check Python installation with: which python3".to_string(),
        ]
    } else if error_lower.contains("command not found") {
        vec![
            format!("Install {base} or check if it's in your PATH"),
            format!("Check if {base} is available with: which {base}"),
            "Verify your PATH environment variable".to_string(),
        ]
    } else if error_lower.contains("permission denied") {
        vec![
            format!("Check file permissions for {base}"),
            "Try running with appropriate permissions".to_string(),
            "Verify you have execute permissions".to_string(),
        ]
    } else {
        Vec::new()
    };

    if suggestions.is_empty() {
        return format!("[ERROR: {error_clean}]");
    }

    let bullets: String = suggestions
        .iter()
        .take(3)
        .map(|s| format!("\n  \u{2022} {s}"))
        .collect();
    format!("[ERROR: {error_clean}]\n[Suggestions:{bullets}]")
}
