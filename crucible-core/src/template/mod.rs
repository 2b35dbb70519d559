//! Template scanning and rendering.

pub mod fragment;
pub mod renderer;

pub use fragment::{extract, Fragment, FragmentKind};
pub use renderer::{RenderResult, RendererConfig, TemplateRenderer};
