//! Error handling for conftree
//!
//! This module provides the error types and user-friendly error reporting for the
//! configuration engine. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`ConftreeError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Tree addressing**: [`ConftreeError::PathNotFound`], [`ConftreeError::AmbiguousPathSegment`],
//!   [`ConftreeError::NotComposite`], [`ConftreeError::KindMismatch`]
//! - **Splicing**: [`ConftreeError::SpliceTargetMissing`], [`ConftreeError::CyclicSplice`]
//! - **Evaluation**: [`ConftreeError::RenderFailure`], [`ConftreeError::NonTerminatingEvaluation`]
//! - **Collaborators**: sources, export, cache and global configuration
//!
//! # Recoverable vs. Fatal
//!
//! `PathNotFound` is returned by [`Node::find`](crate::tree::Node::find) and is
//! consumed internally where a missing node is a decision input (identifier
//! qualification, reference graph construction). Everything else aborts the run:
//! the CLI converts the first error into an [`ErrorContext`] with
//! [`user_friendly_error`] and exits with a non-zero status.
//!
//! # Examples
//!
//! ```rust,no_run
//! use conftree::core::{ConftreeError, user_friendly_error};
//!
//! let error = ConftreeError::SpliceTargetMissing {
//!     splice: "servers.-".to_string(),
//!     target: "shared.servers".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use strsim::levenshtein;
use thiserror::Error;

use crate::templating::RenderError;

/// Maximum Levenshtein distance, as a percentage of the key length, for "did you mean" hints.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// The main error type for conftree operations.
///
/// Every variant that concerns a node of the tree carries the node's dotted path
/// so the failing location can be reported to the user.
#[derive(Error, Debug)]
pub enum ConftreeError {
    /// No node exists at a path.
    ///
    /// # Fields
    /// - `path`: The full path that was looked up
    /// - `missing`: The prefix of `path` whose last segment had no match
    /// - `available`: Labels present at the level where the lookup failed
    #[error("Path '{path}' not found (no node at '{missing}')")]
    PathNotFound {
        path: String,
        missing: String,
        available: Vec<String>,
    },

    /// A dotted path segment cannot be mapped to a name or index without guessing.
    #[error("Ambiguous path segment '{segment}' in '{path}': {reason}")]
    AmbiguousPathSegment {
        path: String,
        segment: String,
        reason: String,
    },

    /// A tree operation was called with an argument it cannot act on.
    #[error("Cannot {operation} '{path}': {reason}")]
    InvalidOperation {
        operation: String,
        path: String,
        reason: String,
    },

    /// An operation that needs a map or list found a scalar.
    #[error("Cannot {operation} '{path}': it holds a {kind}, not a map or list")]
    NotComposite {
        operation: String,
        path: String,
        kind: String,
    },

    /// A node has a different kind than the operation requires.
    #[error("Kind mismatch at '{path}': expected {expected}, found {found}")]
    KindMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A splice references a path that does not exist.
    #[error("Splice '{splice}' references missing target '{target}'")]
    SpliceTargetMissing {
        splice: String,
        target: String,
    },

    /// A splice references itself or one of its own ancestors.
    #[error("Splice '{splice}' references its own ancestor '{target}'")]
    CyclicSplice {
        splice: String,
        target: String,
    },

    /// The template evaluator failed on a leaf.
    #[error("Failed to render '{path}'")]
    RenderFailure {
        path: String,
        #[source]
        source: RenderError,
    },

    /// A leaf never reaches a marker-free value.
    ///
    /// # Fields
    /// - `path`: The leaf being evaluated
    /// - `text`: The last text seen for that leaf
    /// - `cycle`: The reference chain, empty when the iteration cap was hit
    #[error("Evaluation of '{path}' does not terminate{}", format_cycle(.cycle))]
    NonTerminatingEvaluation {
        path: String,
        text: String,
        cycle: Vec<String>,
    },

    /// A source file could not be read.
    #[error("Failed to read source file '{file}'")]
    SourceRead {
        file: String,
        source: std::io::Error,
    },

    /// A source document is not valid TOML.
    #[error("Failed to parse {source_name}: {message}")]
    SourceParse {
        source_name: String,
        message: String,
    },

    /// The tree cannot be written in the requested output format.
    #[error("Cannot export as {format}: {message}")]
    Export {
        format: String,
        message: String,
    },

    /// Reading or writing the result cache failed.
    #[error("Cache {operation} failed: {message}")]
    Cache {
        operation: String,
        message: String,
    },

    /// The global settings file is invalid.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything not covered by a dedicated variant.
    #[error("{message}")]
    Other {
        message: String,
    },
}

fn format_cycle(cycle: &[String]) -> String {
    if cycle.is_empty() {
        String::new()
    } else {
        format!(": reference cycle {}", cycle.join(" -> "))
    }
}

/// Labels from `available` that are close to `target`, closest first.
pub fn find_similar(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> =
        available.iter().map(|candidate| (candidate, levenshtein(target, candidate))).collect();
    scored.sort_by_key(|(_, distance)| *distance);

    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(candidate, _)| candidate.clone())
        .collect()
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ConftreeError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: ConftreeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

fn error_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// [`ConftreeError`]s (also when wrapped with `anyhow` context) get tailored
/// suggestions; IO and TOML errors get generic guidance; anything else is
/// reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let outer = error.to_string();
    let error = match error.downcast::<ConftreeError>() {
        Ok(conftree_error) => {
            let inner = conftree_error.to_string();
            let ctx = create_error_context(conftree_error);
            return if outer == inner || ctx.details.is_some() {
                ctx
            } else {
                ctx.with_details(outer)
            };
        }
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let suggestion = match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                "Check that the file or directory exists and the path is correct"
            }
            std::io::ErrorKind::PermissionDenied => {
                "Check the file permissions and ownership of the path"
            }
            _ => "Re-run with --verbose for more information",
        };
        return ErrorContext::new(ConftreeError::Other {
            message: error_chain(&error),
        })
        .with_suggestion(suggestion);
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(ConftreeError::Other {
            message: error_chain(&error),
        })
        .with_suggestion("Check the TOML syntax: verify quotes, brackets and table headers");
    }

    ErrorContext::new(ConftreeError::Other {
        message: error_chain(&error),
    })
}

/// Map each [`ConftreeError`] variant to a context with tailored suggestions.
fn create_error_context(error: ConftreeError) -> ErrorContext {
    match &error {
        ConftreeError::PathNotFound {
            missing,
            available,
            ..
        } => {
            let key = missing.rsplit('.').next().unwrap_or(missing);
            let similar = find_similar(key, available);
            let ctx = ErrorContext::new(error);
            if similar.is_empty() {
                ctx.with_suggestion("Check the path against the keys of your configuration")
            } else {
                ctx.with_suggestion(format!("Did you mean: {}?", similar.join(", ")))
            }
        }
        ConftreeError::AmbiguousPathSegment {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Use non-empty segments; numeric segments are list indices and must not be zero-padded",
        ),
        ConftreeError::NotComposite {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Promote or narrow to a table or list, not a single value"),
        ConftreeError::KindMismatch {
            ..
        } => ErrorContext::new(error).with_details(
            "Tables can only be merged into tables and arrays into arrays",
        ),
        ConftreeError::SpliceTargetMissing {
            target,
            ..
        } => {
            let suggestion =
                format!("Define '{target}' in one of the sources, or fix the '-' entry");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        ConftreeError::CyclicSplice {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("A '-' entry cannot splice the table or array it lives in"),
        ConftreeError::RenderFailure {
            source,
            ..
        } => {
            let details = source.to_string();
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion(
                    "Check template syntax: values use {{ .path }}, control flow uses {% %}, comments use {# #}",
                )
        }
        ConftreeError::NonTerminatingEvaluation {
            text,
            cycle,
            ..
        } => {
            let details = format!("Last value: {text}");
            let suggestion = if cycle.is_empty() {
                "A value keeps producing new template markers; check for values that render templates"
            } else {
                "Break the cycle so that at least one value in the chain is a plain value"
            };
            ErrorContext::new(error).with_details(details).with_suggestion(suggestion)
        }
        ConftreeError::SourceRead {
            source,
            ..
        } => {
            let details = source.to_string();
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("Check that the file exists and is readable")
        }
        ConftreeError::SourceParse {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax: verify quotes, brackets and table headers"),
        ConftreeError::Export {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use --output keys, shell or flat, or narrow to a table"),
        ConftreeError::Cache {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Re-run with --skip-cache, or remove the cache directory"),
        ConftreeError::Config {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the global settings file, or pass another one with --config"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConftreeError::PathNotFound {
            path: "a.b".to_string(),
            missing: "a.b".to_string(),
            available: vec![],
        };
        assert_eq!(error.to_string(), "Path 'a.b' not found (no node at 'a.b')");

        let error = ConftreeError::NonTerminatingEvaluation {
            path: "a".to_string(),
            text: "{{ .b }}".to_string(),
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(error.to_string(), "Evaluation of 'a' does not terminate: reference cycle a -> b -> a");

        let error = ConftreeError::NonTerminatingEvaluation {
            path: "a".to_string(),
            text: String::new(),
            cycle: vec![],
        };
        assert_eq!(error.to_string(), "Evaluation of 'a' does not terminate");
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(ConftreeError::Config {
            message: "bad".to_string(),
        })
        .with_suggestion("Fix it")
        .with_details("Because");

        let display = format!("{ctx}");
        assert!(display.contains("Configuration error: bad"));
        assert!(display.contains("Details: Because"));
        assert!(display.contains("Suggestion: Fix it"));
    }

    #[test]
    fn test_path_not_found_suggests_similar_keys() {
        let error = ConftreeError::PathNotFound {
            path: "server.hots".to_string(),
            missing: "server.hots".to_string(),
            available: vec!["host".to_string(), "port".to_string()],
        };
        let ctx = user_friendly_error(anyhow::Error::from(error));
        assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean: host?"));
    }

    #[test]
    fn test_context_wrapped_error_keeps_outer_message() {
        let error = anyhow::Error::from(ConftreeError::Cache {
            operation: "write".to_string(),
            message: "disk full".to_string(),
        })
        .context("Failed to store result");

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, ConftreeError::Cache { .. }));
        assert_eq!(ctx.details.as_deref(), Some("Failed to store result"));
    }

    #[test]
    fn test_generic_error_includes_chain() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(error);
        let message = ctx.error.to_string();
        assert!(message.starts_with("outer"));
        assert!(message.contains("1: root cause"));
    }

    #[test]
    fn test_find_similar() {
        let available = vec!["database".to_string(), "debug".to_string(), "zzz".to_string()];
        assert_eq!(find_similar("databse", &available), vec!["database".to_string()]);
        assert!(find_similar("x", &available).is_empty());
    }
}
