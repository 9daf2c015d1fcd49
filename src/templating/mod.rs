//! Template evaluation for configuration values.
//!
//! String values may embed template expressions that refer to other values of
//! the configuration. This module defines the evaluator seam ([`Renderer`])
//! used by the evaluation loop, and its default implementation on top of Tera.
//!
//! # Syntax
//!
//! - `{{ .server.host }}` - a reference to another value, by dotted path
//! - `{{ name }}` - a plain variable (any top-level key)
//! - `{% if .debug %}...{% endif %}` - control flow
//! - `{# ... #}` - comments
//! - `{{ sh(cmd='...') }}`, `{{ .x | shpipe(cmd='...') }}` - shell helpers, see [`filters`]
//!
//! References that do not resolve render as an empty string instead of
//! failing, because evaluation substitutes values in several rounds and a
//! reference may only become meaningful after promotion.
//!
//! # Examples
//!
//! ```rust,no_run
//! use conftree::templating::{Renderer, TemplateRenderer};
//!
//! let renderer = TemplateRenderer::default();
//! let context: toml::Value = toml::from_str("a = 'hello'").unwrap();
//! let output = renderer.render("{{ .a }} world", &context).unwrap();
//! assert_eq!(output, "hello world");
//! ```

pub mod context;
pub mod error;
pub mod filters;
pub mod references;
pub mod renderer;

pub use error::RenderError;
pub use references::{contains_markers, references, translate};
pub use renderer::TemplateRenderer;

use crate::tree::NestedValue;

/// The template evaluator used by the evaluation loop.
///
/// Implementations must substitute an empty value for lookups that do not
/// resolve instead of failing.
pub trait Renderer: Send + Sync {
    /// Render `template` against `context`.
    fn render(&self, template: &str, context: &NestedValue) -> Result<String, RenderError>;
}
