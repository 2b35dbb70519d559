//! Built-in policy tables: the default denylist and the dangerous pattern set.
//!
//! These are deliberately immutable module constants. Callers who want a
//! different denylist pass one to [`DenylistValidator::new`] - there is no
//! process-wide mutable policy state.
//!
//! [`DenylistValidator::new`]: super::DenylistValidator::new

use once_cell::sync::Lazy;
use regex::Regex;

/// Default denied command prefixes.
///
/// An entry matches when it equals the tokenized base command or when the
/// full command string starts with it (which is how multi-word entries like
/// `"cp /"` take effect).
pub const DEFAULT_DENYLIST: &[&str] = &[
    // Destructive filesystem operations
    "rm",
    "rmdir",
    "del",
    "delete",
    "format",
    "fdisk",
    "mkfs",
    "dd",
    // Power and process control
    "shutdown",
    "reboot",
    "halt",
    "poweroff",
    "init",
    "kill",
    "killall",
    "pkill",
    // Permission and privilege escalation
    "chmod",
    "chown",
    "chgrp",
    "passwd",
    "sudo",
    "su",
    "doas",
    "runas",
    // Dangerous when aimed at system paths
    "mv",
    "cp /",
    "rsync /",
    "tar --",
    "gzip -d /",
    "gunzip /",
    "unzip /",
    // Network egress
    "wget",
    "curl",
    "ssh",
    "scp",
    "ftp",
    "sftp",
    "nc",
    "netcat",
    "telnet",
    "ping -f",
    // Fork bombs
    "fork",
    ":()",
    // Code-execution primitives
    "eval",
    "exec",
    "source",
    ".",
];

/// Patterns that are denied regardless of the base command.
///
/// These catch destructive constructions whose base command may itself be
/// harmless (for example `echo payload | sh`).
pub static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // rm -rf /
        r"(?i)rm\s+-rf\s+/",
        // classic fork bomb
        r"(?i):\(\)\s*\{\s*:\|:&\s*\}\s*;\s*:",
        // raw writes to block devices
        r"(?i)>\s*/dev/sd[a-z]",
        r"(?i)dd\s+.*of\s*=\s*/dev/",
        // world-writable root
        r"(?i)chmod\s+777\s+/",
        r"(?i)chown\s+.*\s+/",
        // piping into a shell
        r"(?i)\|\s*sh",
        // nested command substitution, a common injection shape
        r"\$\(.*\$\(.*\).*\)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("dangerous patterns are vetted literals"))
    .collect()
});
