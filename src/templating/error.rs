//! Errors reported by the template evaluator.

use thiserror::Error;

/// Failure of a single render call.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template text could not be parsed.
    #[error("Template syntax error{}: {message}", format_line(.line))]
    Syntax {
        message: String,
        /// 1-indexed line of the template, when the engine reports one
        line: Option<usize>,
    },

    /// A plain (non-reference) variable is not defined in the context.
    #[error("Template variable not found: '{variable}'{}", format_suggestions(.suggestions))]
    VariableNotFound {
        variable: String,
        suggestions: Vec<String>,
    },

    /// The template parsed but failed while rendering, including failures of
    /// the `sh` and `shpipe` helpers.
    #[error("Template evaluation failed: {message}")]
    Evaluation {
        message: String,
    },

    /// The data handed to the evaluator cannot be used as a template context.
    #[error("Invalid template context: {message}")]
    Context {
        message: String,
    },
}

fn format_line(line: &Option<usize>) -> String {
    line.map(|line| format!(" at line {line}")).unwrap_or_default()
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = RenderError::Syntax {
            message: "unexpected end".to_string(),
            line: Some(3),
        };
        assert_eq!(error.to_string(), "Template syntax error at line 3: unexpected end");

        let error = RenderError::VariableNotFound {
            variable: "hots".to_string(),
            suggestions: vec!["host".to_string()],
        };
        assert_eq!(error.to_string(), "Template variable not found: 'hots' (did you mean: host?)");
    }
}
