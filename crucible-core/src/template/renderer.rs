//! Template renderer - orchestrates policy, execution, fallbacks, and
//! substitution for one render call.
//!
//! A render call is a strictly sequential pipeline: generate placeholders,
//! extract fragments, execute command fragments, substitute. No state
//! survives the call - no caches, no learned policy, no process pool.
//! Re-validating an identical command on the next render is the price paid
//! for removing every staleness and poisoning bug by construction.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::advisor;
use crate::exec::{CommandRunner, ExecutionOutcome, ShellRunner};
use crate::generator::{GeneratorSpec, PlaceholderGeneratorExecutor};
use crate::policy::{CommandValidator, CompositeValidator, SecurityDecision};
use crate::template::fragment::{self, Fragment};

/// Configuration injected by the surrounding application.
///
/// The renderer owns nothing here: the disabled-command list and the master
/// switch come from the collaborator's configuration layer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Disabled command prefixes; empty selects the built-in denylist
    pub disabled_commands: Vec<String>,

    /// Master switch: when false, rendering performs variable substitution
    /// only and spawns no processes at all
    pub commands_enabled: bool,

    /// Per-command wall-clock timeout in seconds
    pub timeout_secs: u64,

    /// Working directory for command fragments
    pub working_dir: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            disabled_commands: Vec::new(),
            commands_enabled: true,
            timeout_secs: 30,
            working_dir: PathBuf::from("."),
        }
    }
}

/// Everything a render call produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderResult {
    /// The template with every fragment replaced by output or diagnostic
    pub output: String,

    /// Placeholder text -> output (or error text) for every distinct
    /// command-kind placeholder; variable placeholders never appear here
    pub fragment_outputs: HashMap<String, String>,
}

/// Renders templates by executing their embedded command fragments under
/// the configured security policy.
pub struct TemplateRenderer {
    validator: CompositeValidator,
    runner: Box<dyn CommandRunner>,
    generator_executor: PlaceholderGeneratorExecutor,
    config: RendererConfig,
}

impl TemplateRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            validator: CompositeValidator::standard(config.disabled_commands.clone()),
            runner: Box::new(ShellRunner),
            generator_executor: PlaceholderGeneratorExecutor::new(config.timeout_secs),
            config,
        }
    }

    /// Replace the command runner. Used by tests to inject instrumented
    /// stubs; production code keeps the default [`ShellRunner`].
    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Preview the policy decision for a command without executing it.
    pub fn check(&self, command: &str) -> SecurityDecision {
        self.validator.check(command)
    }

    /// Convenience wrapper over [`check`](Self::check).
    pub fn is_allowed(&self, command: &str) -> bool {
        self.check(command).allowed
    }

    /// Render a template: run generators, execute embedded commands, and
    /// substitute placeholders.
    ///
    /// Never fails: policy denials, execution failures, and timeouts all
    /// surface as bracketed diagnostic text at the fragment's position, and
    /// one fragment's failure never blocks the rest. Variables with no
    /// supplied value are left untouched as literal `{name}` text.
    pub async fn render(
        &self,
        template: &str,
        variables: &HashMap<String, String>,
        execute_commands: bool,
        generators: &[GeneratorSpec],
        execute_generators: bool,
    ) -> RenderResult {
        let spawning_enabled = self.config.commands_enabled;

        // Phase 1: generated placeholders, caller-supplied variables win on
        // key collision.
        let mut merged: HashMap<String, String> = HashMap::new();
        if spawning_enabled && execute_generators && !generators.is_empty() {
            merged = self.generator_executor.execute(generators).await;
        }
        for (name, value) in variables {
            merged.insert(name.clone(), value.clone());
        }

        // Phase 2: extraction.
        let fragments = fragment::extract(template);

        // Phase 3: command execution, memoized by placeholder text so a
        // placeholder appearing twice runs exactly once.
        let mut fragment_outputs: HashMap<String, String> = HashMap::new();
        if spawning_enabled && execute_commands {
            for fragment in fragments.iter().filter(|f| f.is_command()) {
                if fragment_outputs.contains_key(&fragment.placeholder) {
                    continue;
                }
                let text = self.resolve_command_fragment(fragment).await;
                fragment_outputs.insert(fragment.placeholder.clone(), text);
            }
        }

        // Phase 4: substitution - command placeholders first (in extraction
        // order, for determinism), then variables in sorted key order.
        let mut output = template.to_string();
        for fragment in fragments.iter().filter(|f| f.is_command()) {
            if let Some(text) = fragment_outputs.get(&fragment.placeholder) {
                output = output.replace(&fragment.placeholder, text);
            }
        }
        let mut names: Vec<&String> = merged.keys().collect();
        names.sort();
        for name in names {
            output = output.replace(&format!("{{{name}}}"), &merged[name]);
        }

        RenderResult {
            output,
            fragment_outputs,
        }
    }

    /// Produce the substitution text for one command fragment.
    async fn resolve_command_fragment(&self, fragment: &Fragment) -> String {
        let command = fragment.payload.as_str();

        let decision = self.validator.check(command);
        if !decision.allowed {
            debug!(
                command,
                reason = decision.reason.as_deref().unwrap_or(""),
                "fragment denied by policy"
            );
            return format!("Command disabled for security: {command}");
        }

        let outcome = self.execute_with_fallback(command).await;
        if outcome.success {
            outcome.stdout.trim().to_string()
        } else {
            advisor::format_error(command, &outcome.stderr)
        }
    }

    /// Run a command; on failure, retry the advisor's validated
    /// alternatives in order and stop at the first success.
    ///
    /// When no alternative succeeds the original failure is returned, so
    /// diagnostics always describe the command the template actually asked
    /// for.
    async fn execute_with_fallback(&self, command: &str) -> ExecutionOutcome {
        let primary = self
            .runner
            .run(command, &self.config.working_dir, self.config.timeout_secs)
            .await;
        if primary.success {
            return primary;
        }

        for (alternative, reason) in advisor::suggest_alternatives(command, &primary.stderr) {
            if !self.validator.check(&alternative).allowed {
                debug!(alternative, "skipping denied fallback candidate");
                continue;
            }
            let mut retry = self
                .runner
                .run(
                    &alternative,
                    &self.config.working_dir,
                    self.config.timeout_secs,
                )
                .await;
            if retry.success {
                debug!(command, alternative, "fallback command succeeded");
                retry.stdout = format!(
                    "{}\n[Note: Used '{alternative}' instead of '{command}' ({reason})]",
                    retry.stdout.trim()
                );
                retry.used_fallback = Some(alternative);
                return retry;
            }
        }

        primary
    }

    /// Probe an allowed command for version and help text.
    ///
    /// Used by CLI diagnostics; denied commands get an `"error"` entry and
    /// no processes are spawned for them.
    pub async fn command_info(&self, command: &str) -> HashMap<String, String> {
        let mut info = HashMap::new();

        if !self.is_allowed(command) {
            info.insert(
                "error".to_string(),
                format!("Command disabled for security: {command}"),
            );
            return info;
        }

        for flag in ["--version", "-V", "-v", "version"] {
            let outcome = self
                .runner
                .run(
                    &format!("{command} {flag}"),
                    &self.config.working_dir,
                    self.config.timeout_secs,
                )
                .await;
            if outcome.success && !outcome.stdout.trim().is_empty() {
                let first_line = outcome.stdout.trim().lines().next().unwrap_or_default();
                info.insert("version".to_string(), first_line.to_string());
                break;
            }
        }

        for flag in ["--help", "-h", "help"] {
            let outcome = self
                .runner
                .run(
                    &format!("{command} {flag}"),
                    &self.config.working_dir,
                    self.config.timeout_secs,
                )
                .await;
            if outcome.success && !outcome.stdout.trim().is_empty() {
                info.insert("help".to_string(), outcome.stdout.trim().to_string());
                break;
            }
        }

        info
    }
}
