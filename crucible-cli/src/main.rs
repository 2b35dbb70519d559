//! Crucible - render templates with sandboxed command execution
//!
//! Thin shim over `crucible-core`: argument parsing, logging setup, and
//! output formatting live here; every decision about what may run belongs
//! to the library.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crucible_core::{GeneratorSpec, RendererConfig, TemplateRenderer};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "crucible",
    about = "Render templates with sandboxed execution of embedded commands",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Parser, Debug)]
enum Command {
    /// Render a template, executing embedded command fragments
    Render {
        /// Template text; reads stdin when omitted
        template: Option<String>,

        /// Variable substitution, repeatable (key=value)
        #[clap(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,

        /// Execute embedded commands (off by default: substitution only)
        #[clap(long)]
        exec: bool,

        /// Disable specific command prefixes instead of the built-in denylist
        #[clap(long = "disable")]
        disabled: Vec<String>,

        /// Per-command timeout in seconds
        #[clap(long, default_value_t = 30)]
        timeout: u64,

        /// Working directory for command fragments
        #[clap(long)]
        workdir: Option<PathBuf>,

        /// JSON file containing placeholder generators to run first
        #[clap(long)]
        generators: Option<PathBuf>,

        /// Emit the full result (output + per-fragment outcomes) as JSON
        #[clap(long)]
        json: bool,
    },

    /// Preview the policy decision for a command without executing it
    Check {
        /// Command to check
        command: String,
    },

    /// Probe an allowed command for version and help text
    Info {
        /// Command to probe
        command: String,

        /// Per-command timeout in seconds
        #[clap(long, default_value_t = 30)]
        timeout: u64,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render {
            template,
            vars,
            exec,
            disabled,
            timeout,
            workdir,
            generators,
            json,
        } => {
            let template = match template {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed to read template from stdin")?;
                    buffer
                }
            };

            let generator_specs: Vec<GeneratorSpec> = match &generators {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("failed to parse {}", path.display()))?
                }
                None => Vec::new(),
            };
            tracing::debug!(
                generators = generator_specs.len(),
                execute = exec,
                "rendering template"
            );

            let renderer = TemplateRenderer::new(RendererConfig {
                disabled_commands: disabled,
                commands_enabled: true,
                timeout_secs: timeout,
                working_dir: workdir.unwrap_or_else(|| PathBuf::from(".")),
            });

            let variables: HashMap<String, String> = vars.into_iter().collect();
            let run_generators = !generator_specs.is_empty();
            let result = renderer
                .render(&template, &variables, exec, &generator_specs, run_generators)
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.output);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Check { command } => {
            let renderer = TemplateRenderer::new(RendererConfig::default());
            let decision = renderer.check(&command);
            if decision.allowed {
                println!("allowed");
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "denied: {}",
                    decision.reason.as_deref().unwrap_or("policy denied")
                );
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Info { command, timeout } => {
            let renderer = TemplateRenderer::new(RendererConfig {
                timeout_secs: timeout,
                ..RendererConfig::default()
            });
            let info = renderer.command_info(&command).await;
            if let Some(error) = info.get("error") {
                bail!("{error}");
            }
            if let Some(version) = info.get("version") {
                println!("version: {version}");
            }
            if let Some(help) = info.get("help") {
                println!("{help}");
            }
            if info.is_empty() {
                println!("no version or help information available");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
