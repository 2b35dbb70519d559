//! Command security policy - allow/deny decisions for candidate commands.
//!
//! Validation is a pure function of the command string and the configured
//! policy tables: no I/O, no environment access. That makes it safe to call
//! speculatively before any process is spawned, and trivial to unit test.
//!
//! The policy fails closed: anything that cannot be tokenized with POSIX
//! shell-quoting rules is denied before the tables are even consulted.

pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The outcome of checking one command against one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDecision {
    /// Whether the command may be executed
    pub allowed: bool,

    /// Human-readable denial reason, present iff `allowed` is false
    pub reason: Option<String>,
}

impl SecurityDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// A single independent policy check.
///
/// Implementations must be stateless with respect to the commands they see;
/// a decision depends only on the command string and construction-time
/// configuration.
pub trait CommandValidator: Send + Sync {
    fn check(&self, command: &str) -> SecurityDecision;
}

/// Denies commands whose base command or full text matches a denylist entry.
pub struct DenylistValidator {
    denylist: Vec<String>,
}

impl DenylistValidator {
    /// Build a validator from an explicit denylist.
    ///
    /// An empty list falls back to [`rules::DEFAULT_DENYLIST`]; matching is
    /// case-insensitive.
    pub fn new(denylist: Vec<String>) -> Self {
        if denylist.is_empty() {
            return Self::default();
        }
        Self {
            denylist: denylist.into_iter().map(|e| e.to_lowercase()).collect(),
        }
    }
}

impl Default for DenylistValidator {
    fn default() -> Self {
        Self {
            denylist: rules::DEFAULT_DENYLIST
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl CommandValidator for DenylistValidator {
    fn check(&self, command: &str) -> SecurityDecision {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return SecurityDecision::deny("invalid or empty command");
        }

        // Unbalanced quotes and other tokenization failures fail closed.
        let words = match shell_words::split(command) {
            Ok(words) if !words.is_empty() => words,
            _ => return SecurityDecision::deny("invalid or empty command"),
        };

        let base = words[0].to_lowercase();
        let full = trimmed.to_lowercase();

        for entry in &self.denylist {
            if base == *entry || full.starts_with(entry.as_str()) {
                debug!(command, entry = entry.as_str(), "command denied by denylist");
                return SecurityDecision::deny(format!("command '{base}' is disabled"));
            }
        }

        SecurityDecision::allow()
    }
}

/// Denies commands that match one of the fixed dangerous patterns,
/// independently of the denylist.
#[derive(Default)]
pub struct DangerousPatternValidator;

impl CommandValidator for DangerousPatternValidator {
    fn check(&self, command: &str) -> SecurityDecision {
        for pattern in rules::DANGEROUS_PATTERNS.iter() {
            if pattern.is_match(command) {
                debug!(
                    command,
                    pattern = pattern.as_str(),
                    "command denied by dangerous pattern"
                );
                return SecurityDecision::deny(format!(
                    "command matches dangerous pattern '{}'",
                    pattern.as_str()
                ));
            }
        }
        SecurityDecision::allow()
    }
}

/// Runs several validators in order; a command is allowed only if all of
/// them allow it, and the reported reason is the first denial.
pub struct CompositeValidator {
    validators: Vec<Box<dyn CommandValidator>>,
}

impl CompositeValidator {
    pub fn new(validators: Vec<Box<dyn CommandValidator>>) -> Self {
        Self { validators }
    }

    /// The standard policy stack: denylist first, then dangerous patterns.
    ///
    /// An empty `disabled_commands` list selects the built-in denylist.
    pub fn standard(disabled_commands: Vec<String>) -> Self {
        Self::new(vec![
            Box::new(DenylistValidator::new(disabled_commands)),
            Box::new(DangerousPatternValidator),
        ])
    }

    pub fn push(&mut self, validator: Box<dyn CommandValidator>) {
        self.validators.push(validator);
    }
}

impl CommandValidator for CompositeValidator {
    fn check(&self, command: &str) -> SecurityDecision {
        for validator in &self.validators {
            let decision = validator.check(command);
            if !decision.allowed {
                return decision;
            }
        }
        SecurityDecision::allow()
    }
}
