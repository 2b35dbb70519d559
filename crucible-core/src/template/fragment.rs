//! Fragment extraction - finds embedded commands and variable placeholders
//! in template text.
//!
//! Three command syntaxes are recognized: `$(...)` shell substitution,
//! `{cmd:...}`, and `{exec:...}`. Any other `{...}` span is a variable
//! placeholder. Classification happens exactly once, here; downstream code
//! dispatches on [`FragmentKind`] and never re-sniffs the text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static SHELL_SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(([^)]+)\)").expect("vetted literal"));

static CMD_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(cmd|exec):([^}]+)\}").expect("vetted literal"));

static BRACE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("vetted literal"));

/// How a fragment's placeholder was written in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// `{name}` variable placeholder
    Variable,
    /// `$(command)` shell substitution
    ShellSubstitution,
    /// `{cmd:command}`
    CmdSyntax,
    /// `{exec:command}`
    ExecSyntax,
}

/// One placeholder span identified inside a template.
///
/// `payload` is the variable name or the trimmed command text. Fragments
/// are derived fresh per render call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The literal substring that gets replaced, e.g. `$(whoami)` or `{name}`
    pub placeholder: String,
    pub kind: FragmentKind,
    pub payload: String,
}

impl Fragment {
    /// True for fragments that require command execution.
    pub fn is_command(&self) -> bool {
        !matches!(self.kind, FragmentKind::Variable)
    }
}

/// Extract all fragments from a template, in left-to-right scan order.
///
/// Command fragments are reported once per occurrence; variable names are
/// deduplicated because substituting a variable is idempotent regardless of
/// how often it appears.
pub fn extract(template: &str) -> Vec<Fragment> {
    // (start offset, fragment) so the three scans can be merged in order
    let mut found: Vec<(usize, Fragment)> = Vec::new();

    for caps in SHELL_SUBSTITUTION.captures_iter(template) {
        let whole = caps.get(0).expect("group 0 always present");
        found.push((
            whole.start(),
            Fragment {
                placeholder: whole.as_str().to_string(),
                kind: FragmentKind::ShellSubstitution,
                payload: caps[1].trim().to_string(),
            },
        ));
    }

    for caps in CMD_SYNTAX.captures_iter(template) {
        let whole = caps.get(0).expect("group 0 always present");
        let kind = if &caps[1] == "cmd" {
            FragmentKind::CmdSyntax
        } else {
            FragmentKind::ExecSyntax
        };
        found.push((
            whole.start(),
            Fragment {
                placeholder: whole.as_str().to_string(),
                kind,
                payload: caps[2].trim().to_string(),
            },
        ));
    }

    let mut seen_variables = HashSet::new();
    for caps in BRACE_SPAN.captures_iter(template) {
        let inner = &caps[1];
        // {cmd:...} and {exec:...} spans are command fragments, never variables
        if inner.starts_with("cmd:") || inner.starts_with("exec:") {
            continue;
        }
        if !seen_variables.insert(inner.to_string()) {
            continue;
        }
        let whole = caps.get(0).expect("group 0 always present");
        found.push((
            whole.start(),
            Fragment {
                placeholder: whole.as_str().to_string(),
                kind: FragmentKind::Variable,
                payload: inner.to_string(),
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, fragment)| fragment).collect()
}
