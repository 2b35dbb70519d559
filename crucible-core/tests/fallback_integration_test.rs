//! Renderer behavior around the runner seam: execution counts, fallback
//! retries, and failure formatting, driven by instrumented stub runners.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crucible_core::exec::{CommandRunner, ExecutionOutcome};
use crucible_core::{RendererConfig, TemplateRenderer};
use pretty_assertions::assert_eq;

/// Counts every run() call and echoes the command back as stdout.
struct CountingRunner {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandRunner for CountingRunner {
    async fn run(&self, command: &str, _: &Path, _: u64) -> ExecutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ExecutionOutcome {
            success: true,
            stdout: format!("ran:{command}"),
            stderr: String::new(),
            used_fallback: None,
        }
    }
}

/// Maps exact command strings to canned outcomes; anything else fails.
struct ScriptedRunner {
    script: Vec<(&'static str, ExecutionOutcome)>,
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, _: &Path, _: u64) -> ExecutionOutcome {
        for (expected, outcome) in &self.script {
            if *expected == command {
                return outcome.clone();
            }
        }
        ExecutionOutcome::failure(format!("sh: {command}: command not found"))
    }
}

fn success(stdout: &str) -> ExecutionOutcome {
    ExecutionOutcome {
        success: true,
        stdout: stdout.to_string(),
        stderr: String::new(),
        used_fallback: None,
    }
}

#[tokio::test]
async fn identical_placeholder_executes_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let renderer = TemplateRenderer::new(RendererConfig::default()).with_runner(Box::new(
        CountingRunner {
            calls: calls.clone(),
        },
    ));

    let result = renderer
        .render(
            "first $(date) second $(date)",
            &HashMap::new(),
            true,
            &[],
            false,
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.output, "first ran:date second ran:date");
}

#[tokio::test]
async fn syntactically_different_placeholders_execute_independently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let renderer = TemplateRenderer::new(RendererConfig::default()).with_runner(Box::new(
        CountingRunner {
            calls: calls.clone(),
        },
    ));

    // Same underlying command, different placeholder text
    renderer
        .render("$(date) {cmd:date}", &HashMap::new(), true, &[], false)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn first_successful_fallback_wins_and_is_annotated() {
    let renderer =
        TemplateRenderer::new(RendererConfig::default()).with_runner(Box::new(ScriptedRunner {
            script: vec![
                (
                    "python script.py",
                    ExecutionOutcome::failure("sh: python: command not found"),
                ),
                ("python3 script.py", success("ok\n")),
            ],
        }));

    let result = renderer
        .render("$(python script.py)", &HashMap::new(), true, &[], false)
        .await;

    assert!(result.output.starts_with("ok"));
    assert!(result
        .output
        .contains("[Note: Used 'python3 script.py' instead of 'python script.py'"));
}

#[tokio::test]
async fn exhausted_fallbacks_keep_the_original_error() {
    let renderer =
        TemplateRenderer::new(RendererConfig::default()).with_runner(Box::new(ScriptedRunner {
            script: Vec::new(), // everything fails with "command not found"
        }));

    let result = renderer
        .render("$(frobnicate --all)", &HashMap::new(), true, &[], false)
        .await;

    // Diagnostic names the command the template asked for, not an alternative
    assert!(result.output.contains("[ERROR: sh: frobnicate --all: command not found]"));
    assert!(result.output.contains("[Suggestions:"));
}

#[tokio::test]
async fn fallback_candidates_are_validated_before_running() {
    struct RecordingRunner {
        seen: Arc<std::sync::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &str, _: &Path, _: u64) -> ExecutionOutcome {
            self.seen.lock().unwrap().push(command.to_string());
            ExecutionOutcome::failure("permission denied")
        }
    }

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    // Denylist the advisor's permission-denied probe prefix; the probe must
    // then never reach the runner.
    let renderer = TemplateRenderer::new(RendererConfig {
        disabled_commands: vec!["ls".to_string()],
        ..RendererConfig::default()
    })
    .with_runner(Box::new(RecordingRunner { seen: seen.clone() }));

    renderer
        .render("$(deploy-tool)", &HashMap::new(), true, &[], false)
        .await;

    let commands = seen.lock().unwrap();
    assert_eq!(commands.as_slice(), ["deploy-tool"]);
}
