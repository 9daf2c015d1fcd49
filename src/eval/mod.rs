//! Evaluation of templated values.
//!
//! After splicing and qualification, string leaves may still contain template
//! markers. Evaluation renders them until every leaf is final:
//!
//! 1. Build a [`ReferenceGraph`] between templated leaves and reject cycles
//!    before anything is rendered.
//! 2. Visit leaves in topological order, so every value a leaf refers to has
//!    already reached its final text.
//! 3. For each leaf, render repeatedly while its text still contains markers.
//!    Each round renders against the whole tree with the leaf's enclosing table
//!    promoted to the top level, so relative references still resolve.
//!
//! The per-leaf loop is bounded by `max_render_iterations`; a value whose
//! output keeps producing markers, or a render that does not change the text,
//! is reported as [`ConftreeError::NonTerminatingEvaluation`].

pub mod graph;

pub use graph::ReferenceGraph;

use toml::Value;

use crate::core::ConftreeError;
use crate::pipeline::EngineContext;
use crate::templating::contains_markers;
use crate::tree::{NestedValue, Node, Path, Scalar};

/// Render every templated leaf of `tree` in place.
///
/// Returns the number of leaves that were rendered.
///
/// # Errors
///
/// - [`ConftreeError::NonTerminatingEvaluation`] for reference cycles and
///   leaves that do not settle within the iteration cap
/// - [`ConftreeError::RenderFailure`] when the evaluator rejects a value
pub fn evaluate(ctx: &EngineContext, tree: &mut Node) -> Result<usize, ConftreeError> {
    let graph = ReferenceGraph::build(tree);
    let order = graph.evaluation_order()?;

    for path in &order {
        let text = match tree.find(path)?.scalar().and_then(Scalar::as_str) {
            Some(text) => text.to_string(),
            None => continue,
        };

        let rendered = evaluate_leaf(ctx, tree, path, text)?;
        tree.find_mut(path)?.set_scalar(Scalar::String(rendered));
    }

    tracing::info!("evaluated {} templated values", order.len());
    Ok(order.len())
}

/// Render one leaf until it no longer contains markers.
fn evaluate_leaf(
    ctx: &EngineContext,
    tree: &Node,
    path: &Path,
    mut text: String,
) -> Result<String, ConftreeError> {
    let scope = tree.enclosing_scope(path);
    let max_iterations = ctx.settings.max_render_iterations;
    let mut iterations = 0;

    while contains_markers(&text) {
        if iterations >= max_iterations {
            tracing::debug!("'{}' still has markers after {} renders", path, iterations);
            return Err(ConftreeError::NonTerminatingEvaluation {
                path: path.to_string(),
                text,
                cycle: Vec::new(),
            });
        }
        iterations += 1;

        let context = scoped_context(tree, &scope)?;
        let rendered = ctx.renderer.render(&text, &context).map_err(|source| {
            ConftreeError::RenderFailure {
                path: path.to_string(),
                source,
            }
        })?;

        if rendered == text {
            return Err(ConftreeError::NonTerminatingEvaluation {
                path: path.to_string(),
                text,
                cycle: Vec::new(),
            });
        }

        tracing::debug!("render: '{}' '{}' -> '{}'", path, text, rendered);
        text = rendered;
    }

    Ok(text)
}

/// The projected tree with the table at `scope` promoted into the top level.
///
/// Keys already present at the top level win over promoted ones.
pub fn scoped_context(tree: &Node, scope: &Path) -> Result<NestedValue, ConftreeError> {
    let mut value = tree.to_value();
    if scope.is_root() {
        return Ok(value);
    }

    if let (Value::Table(top), Value::Table(scoped)) = (&mut value, tree.find(scope)?.to_value()) {
        for (key, entry) in scoped {
            if !top.contains_key(&key) {
                top.insert(key, entry);
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::pipeline::EngineSettings;
    use crate::templating::{RenderError, Renderer};
    use crate::test_utils::tree_from_toml;
    use std::sync::Arc;

    fn context() -> EngineContext {
        EngineContext::with_settings(EngineSettings {
            shell: "sh".to_string(),
            ..EngineSettings::default()
        })
    }

    fn value_at(tree: &Node, path: &Path) -> String {
        tree.find(path).unwrap().scalar().unwrap().to_string()
    }

    #[test]
    fn test_hello_world() {
        let mut tree = tree_from_toml("a = 'hello'\nb = '{{.a}} world'").unwrap();

        evaluate(&context(), &mut tree).unwrap();
        assert_eq!(value_at(&tree, &path!["b"]), "hello world");
    }

    #[test]
    fn test_chained_references() {
        crate::test_utils::init_test_logging(None);
        let mut tree =
            tree_from_toml("a = '{{ .b }}-a'\nb = '{{ .c }}-b'\nc = '{{ .d }}-c'\nd = 'd'").unwrap();

        assert_eq!(evaluate(&context(), &mut tree).unwrap(), 3);
        assert_eq!(value_at(&tree, &path!["a"]), "d-c-b-a");
        tree.walk(|_, node| {
            if let Some(text) = node.scalar().and_then(Scalar::as_str) {
                assert!(!contains_markers(text));
            }
        });
    }

    #[test]
    fn test_relative_references_use_enclosing_scope() {
        let mut tree = tree_from_toml(
            "name = 'top'\n[svc]\nhost = 'h'\nurl = 'http://{{ .host }}/{{ .name }}'",
        )
        .unwrap();

        evaluate(&context(), &mut tree).unwrap();
        // Top-level keys win over promoted ones.
        assert_eq!(value_at(&tree, &path!["svc", "url"]), "http://h/top");
    }

    #[test]
    fn test_cycle_is_non_terminating() {
        let mut tree = tree_from_toml("a = '{{.b}}'\nb = '{{.a}}'").unwrap();

        let err = evaluate(&context(), &mut tree).unwrap_err();
        assert!(matches!(err, ConftreeError::NonTerminatingEvaluation { .. }), "got {err:?}");
    }

    #[test]
    fn test_render_failure_names_the_leaf() {
        let mut tree = tree_from_toml("[a]\nbad = '{{ nope( }}'").unwrap();

        let err = evaluate(&context(), &mut tree).unwrap_err();
        match err {
            ConftreeError::RenderFailure {
                path,
                ..
            } => assert_eq!(path, "a.bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Renders `{{ x }}` back into itself with one more marker.
    struct RegeneratingRenderer;

    impl Renderer for RegeneratingRenderer {
        fn render(&self, template: &str, _context: &NestedValue) -> Result<String, RenderError> {
            Ok(format!("{template}{{{{"))
        }
    }

    #[test]
    fn test_iteration_cap() {
        let mut tree = tree_from_toml("a = '{{ x }}'").unwrap();
        let ctx = EngineContext::new(
            EngineSettings {
                max_render_iterations: 3,
                ..EngineSettings::default()
            },
            Arc::new(RegeneratingRenderer),
        );

        let err = evaluate(&ctx, &mut tree).unwrap_err();
        match err {
            ConftreeError::NonTerminatingEvaluation {
                path,
                cycle,
                ..
            } => {
                assert_eq!(path, "a");
                assert!(cycle.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scoped_context_promotes_scope() {
        let tree = tree_from_toml("x = 1\n[s]\nx = 2\ny = 3").unwrap();

        let value = scoped_context(&tree, &path!["s"]).unwrap();
        assert_eq!(value.get("x").and_then(Value::as_integer), Some(1));
        assert_eq!(value.get("y").and_then(Value::as_integer), Some(3));
    }
}
