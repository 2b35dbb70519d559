//! End-to-end rendering tests against the real shell runner.
//!
//! These execute harmless commands (`echo`, `sleep`) through `sh -c`; every
//! dangerous command in here is expected to be stopped by policy before any
//! process is spawned.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crucible_core::exec::{CommandRunner, ShellRunner};
use crucible_core::{RendererConfig, TemplateRenderer};
use pretty_assertions::assert_eq;

fn renderer() -> TemplateRenderer {
    TemplateRenderer::new(RendererConfig::default())
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn renders_commands_and_variables_together() {
    let result = renderer()
        .render(
            "User: $(echo hi), Name: {name}",
            &vars(&[("name", "Ada")]),
            true,
            &[],
            false,
        )
        .await;

    assert_eq!(result.output, "User: hi, Name: Ada");
    assert_eq!(result.fragment_outputs.len(), 1);
    assert_eq!(
        result.fragment_outputs.get("$(echo hi)").map(String::as_str),
        Some("hi")
    );
}

#[tokio::test]
async fn denied_command_is_substituted_as_diagnostic_text() {
    let result = renderer()
        .render("$(rm -rf /tmp/x)", &HashMap::new(), true, &[], false)
        .await;

    assert_eq!(result.output, "Command disabled for security: rm -rf /tmp/x");
}

#[tokio::test]
async fn one_denied_fragment_does_not_block_the_rest() {
    let result = renderer()
        .render(
            "bad: $(sudo whoami) good: $(echo fine)",
            &HashMap::new(),
            true,
            &[],
            false,
        )
        .await;

    assert_eq!(
        result.output,
        "bad: Command disabled for security: sudo whoami good: fine"
    );
    assert_eq!(result.fragment_outputs.len(), 2);
}

#[tokio::test]
async fn cmd_and_exec_syntaxes_execute_like_shell_substitution() {
    let result = renderer()
        .render("a={cmd:echo one} b={exec:echo two}", &HashMap::new(), true, &[], false)
        .await;

    assert_eq!(result.output, "a=one b=two");
}

#[tokio::test]
async fn repeated_placeholder_is_substituted_everywhere() {
    let result = renderer()
        .render("$(echo x) and $(echo x)", &HashMap::new(), true, &[], false)
        .await;

    assert_eq!(result.output, "x and x");
    assert_eq!(result.fragment_outputs.len(), 1);
}

#[tokio::test]
async fn rendering_without_commands_is_plain_string_replacement() {
    let template = "Hello {a}, meet {b}.";
    let variables = vars(&[("a", "one"), ("b", "two")]);

    // Equivalent regardless of the execute_commands flag
    let with_flag = renderer()
        .render(template, &variables, true, &[], false)
        .await;
    let without_flag = renderer()
        .render(template, &variables, false, &[], false)
        .await;

    assert_eq!(with_flag.output, "Hello one, meet two.");
    assert_eq!(with_flag.output, without_flag.output);
}

#[tokio::test]
async fn timed_out_command_reports_within_bounded_margin() {
    let started = Instant::now();
    let outcome = ShellRunner.run("sleep 5", ".".as_ref(), 1).await;
    let elapsed = started.elapsed();

    assert!(!outcome.success);
    assert!(outcome.stderr.contains("timed out after 1 seconds"));
    assert!(
        elapsed < Duration::from_secs(2),
        "timeout took {elapsed:?}, expected < 2s"
    );
}

#[tokio::test]
async fn timed_out_fragment_renders_as_error_text() {
    let renderer = TemplateRenderer::new(RendererConfig {
        timeout_secs: 1,
        ..RendererConfig::default()
    });
    let result = renderer
        .render("$(sleep 5)", &HashMap::new(), true, &[], false)
        .await;

    assert!(result.output.contains("[ERROR:"));
    assert!(result.output.contains("timed out after 1 seconds"));
}

#[tokio::test]
async fn custom_denylist_overrides_the_default() {
    let renderer = TemplateRenderer::new(RendererConfig {
        disabled_commands: vec!["echo".to_string()],
        ..RendererConfig::default()
    });

    let result = renderer
        .render("$(echo hi)", &HashMap::new(), true, &[], false)
        .await;
    assert_eq!(result.output, "Command disabled for security: echo hi");

    // The dangerous pattern set still applies independently of the denylist
    assert!(!renderer.is_allowed("cat payload | sh"));
}

#[tokio::test]
async fn fragment_outputs_never_contain_variable_placeholders() {
    let result = renderer()
        .render("$(echo hi) {name}", &vars(&[("name", "Ada")]), true, &[], false)
        .await;

    assert!(result.fragment_outputs.contains_key("$(echo hi)"));
    assert!(!result.fragment_outputs.contains_key("{name}"));
    assert!(!result.fragment_outputs.contains_key("name"));
}
