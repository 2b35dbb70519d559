//! Crucible - policy-checked execution of template-embedded commands.
//!
//! A template may carry shell command substitutions (`$(...)`, `{cmd:...}`,
//! `{exec:...}`), `{name}` variable placeholders, and scripted placeholder
//! generators. Rendering scans the template, decides per fragment whether
//! the embedded command is safe to run, executes permitted fragments under
//! a wall-clock timeout, and substitutes their output - or a bracketed
//! diagnostic - back into the text. The caller always gets a rendered
//! string; fragment failures are data, not errors.

pub mod advisor;
pub mod exec;
pub mod generator;
pub mod policy;
pub mod template;

pub use exec::{CommandRunner, ExecutionOutcome, ShellRunner};
pub use generator::{GeneratorLanguage, GeneratorSpec, PlaceholderGeneratorExecutor};
pub use policy::{
    CommandValidator, CompositeValidator, DangerousPatternValidator, DenylistValidator,
    SecurityDecision,
};
pub use template::{RenderResult, RendererConfig, TemplateRenderer};
