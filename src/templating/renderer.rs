//! Template rendering engine with Tera.
//!
//! [`TemplateRenderer`] is the default [`Renderer`]: it translates dotted
//! references, builds a context from the nested structure, registers the shell
//! helpers and renders the text as a one-off Tera template.

use regex::Regex;
use std::collections::BTreeSet;
use tera::{Context as TeraContext, Tera};

use super::context::build_context;
use super::error::RenderError;
use super::filters;
use super::references::translate;
use super::Renderer;
use crate::constants::{DEFAULT_SHELL, TREE_VARIABLE};
use crate::core::find_similar;
use crate::tree::NestedValue;

/// Tera-backed template renderer.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    /// Shell used by the `sh` function and the `shpipe` filter
    shell: String,
}

impl TemplateRenderer {
    /// Create a renderer whose shell helpers run through `shell`.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Parse a Tera error into a [`RenderError`].
    fn parse_tera_error(error: &tera::Error, context: &TeraContext) -> RenderError {
        let message = Self::format_tera_error(error);

        let undefined =
            Self::error_chain(error).iter().find_map(|msg| Self::extract_variable_name(msg));
        if let Some(variable) = undefined {
            let available = Self::available_variables(context);
            let suggestions = find_similar(&variable, &available);
            return RenderError::VariableNotFound {
                variable,
                suggestions,
            };
        }

        if error.to_string().starts_with("Failed to parse") {
            return RenderError::Syntax {
                message,
                line: Self::extract_line_from_tera_error(error),
            };
        }

        RenderError::Evaluation {
            message,
        }
    }

    fn error_chain(error: &tera::Error) -> Vec<String> {
        use std::error::Error;

        let mut messages = vec![error.to_string()];
        let mut current: Option<&dyn Error> = error.source();
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }
        messages
    }

    /// Extract variable name from "Variable `foo` not found" message
    fn extract_variable_name(message: &str) -> Option<String> {
        let re = Regex::new(r"Variable `([^`]+)` not found").ok()?;
        re.captures(message).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
    }

    /// Top-level variables of the context, without the reserved tree variable.
    fn available_variables(context: &TeraContext) -> Vec<String> {
        match context.clone().into_json() {
            serde_json::Value::Object(map) => map
                .keys()
                .filter(|key| key.as_str() != TREE_VARIABLE)
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Extract line number from Tera error message
    ///
    /// Tera includes line:column information in parse error messages.
    /// Examples: "1:7", "15:23"
    fn extract_line_from_tera_error(error: &tera::Error) -> Option<usize> {
        let error_msg = format!("{:?}", error);

        let re = Regex::new(r"(\d+):(\d+)").ok()?;
        re.captures(&error_msg)
            .and_then(|caps| caps.get(1))
            .and_then(|line| line.as_str().parse::<usize>().ok())
    }

    /// Format a Tera error with detailed information about what went wrong.
    ///
    /// Walks the error chain and removes the internal one-off template name so
    /// messages read like "Variable `x` not found in context".
    pub fn format_tera_error(error: &tera::Error) -> String {
        let messages: Vec<String> = Self::error_chain(error)
            .into_iter()
            .map(|msg| {
                msg.replace("while rendering '__tera_one_off'", "")
                    .replace("Failed to render '__tera_one_off'", "Template rendering failed")
                    .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                    .replace("'__tera_one_off'", "template")
                    .trim()
                    .to_string()
            })
            .filter(|cleaned| {
                !cleaned.is_empty()
                    && cleaned != "Template rendering failed"
                    && cleaned != "Template syntax error"
            })
            .collect();

        if messages.is_empty() {
            "Template syntax error (see details above)".to_string()
        } else {
            messages.join("\n  -> ")
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str, context: &NestedValue) -> Result<String, RenderError> {
        let translated = translate(template);
        let tera_context = build_context(context)?;

        // Fresh Tera instance per render
        let mut tera = Tera::default();
        tera.register_function("sh", filters::create_sh_function(self.shell.clone()));
        tera.register_filter("shpipe", filters::create_shpipe_filter(self.shell.clone()));

        tracing::trace!("render: '{}' -> '{}'", template, translated);
        tera.render_str(&translated, &tera_context)
            .map_err(|e| Self::parse_tera_error(&e, &tera_context))
    }
}
