//! The build pipeline and the context threaded through it.
//!
//! A run creates one [`EngineContext`] and hands it to every pass that needs
//! settings or the evaluator. Building a configuration always runs the passes
//! in the same order:
//!
//! ```text
//! ingest -> splice -> qualify -> evaluate -> (promote / narrow) -> view
//! ```
//!
//! Each pass relies on the invariants left by the previous one, so they never
//! overlap.
//!
//! # Examples
//!
//! ```rust,no_run
//! use conftree::pipeline::{EngineContext, EngineSettings, Pipeline};
//!
//! let ctx = EngineContext::with_settings(EngineSettings::default());
//! let input: toml::Value = toml::from_str("a = 'hello'\nb = '{{ .a }} world'").unwrap();
//! let tree = Pipeline::build(&ctx, &input).unwrap();
//! assert_eq!(Pipeline::query(&ctx, &tree, "b").unwrap(), "hello world");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::constants::{DEFAULT_MAX_RENDER_ITERATIONS, DEFAULT_SHELL};
use crate::core::ConftreeError;
use crate::eval;
use crate::templating::{Renderer, TemplateRenderer};
use crate::transform;
use crate::tree::{NestedValue, Node, Path};

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Upper bound of render rounds for a single value
    pub max_render_iterations: usize,
    /// Shell used by the template shell helpers
    pub shell: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_render_iterations: DEFAULT_MAX_RENDER_ITERATIONS,
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

/// Everything a pass needs besides the tree itself.
#[derive(Clone)]
pub struct EngineContext {
    pub settings: EngineSettings,
    pub renderer: Arc<dyn Renderer>,
}

impl EngineContext {
    pub fn new(settings: EngineSettings, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            settings,
            renderer,
        }
    }

    /// A context using the Tera renderer configured from `settings`.
    pub fn with_settings(settings: EngineSettings) -> Self {
        let renderer = Arc::new(TemplateRenderer::new(settings.shell.clone()));
        Self::new(settings, renderer)
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext").field("settings", &self.settings).finish_non_exhaustive()
    }
}

/// Entry points of the build pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Ingest `input` and run splicing, qualification and evaluation.
    ///
    /// The returned tree holds final values only.
    pub fn build(ctx: &EngineContext, input: &NestedValue) -> Result<Node, ConftreeError> {
        let mut tree = {
            let _span = tracing::debug_span!("ingest").entered();
            Node::from_structure(input)
        };

        {
            let _span = tracing::debug_span!("splice").entered();
            transform::resolve_splices(&mut tree)?;
        }
        {
            let _span = tracing::debug_span!("qualify").entered();
            transform::qualify(&mut tree)?;
        }
        {
            let _span = tracing::debug_span!("evaluate").entered();
            eval::evaluate(ctx, &mut tree)?;
        }

        Ok(tree)
    }

    /// Apply `promotions` in order, then narrow to `narrow` if given.
    pub fn project(
        mut tree: Node,
        promotions: &[Path],
        narrow: Option<&Path>,
    ) -> Result<Node, ConftreeError> {
        let _span = tracing::debug_span!("project").entered();

        for path in promotions {
            tracing::debug!("promote: '{}'", path);
            tree.promote(path)?;
        }
        if let Some(path) = narrow {
            tracing::debug!("narrow: '{}'", path);
            tree.narrow(path)?;
        }
        Ok(tree)
    }

    /// Render an ad-hoc template against `tree`.
    pub fn render_text(ctx: &EngineContext, tree: &Node, text: &str) -> Result<String, ConftreeError> {
        Self::render_as(ctx, tree, text, ".")
    }

    /// Render the value at the dotted path `query`.
    ///
    /// Composites render in the evaluator's own notation.
    pub fn query(ctx: &EngineContext, tree: &Node, query: &str) -> Result<String, ConftreeError> {
        let path = Path::parse(query)?;
        let template = if path.is_root() {
            "{{ __tree }}".to_string()
        } else {
            format!("{{{{ .{path} }}}}")
        };
        Self::render_as(ctx, tree, &template, query)
    }

    fn render_as(
        ctx: &EngineContext,
        tree: &Node,
        text: &str,
        name: &str,
    ) -> Result<String, ConftreeError> {
        let context = tree.to_value();
        ctx.renderer.render(text, &context).map_err(|source| ConftreeError::RenderFailure {
            path: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::templating::contains_markers;
    use crate::tree::Scalar;

    fn context() -> EngineContext {
        EngineContext::with_settings(EngineSettings {
            shell: "sh".to_string(),
            ..EngineSettings::default()
        })
    }

    fn input(text: &str) -> NestedValue {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_build_runs_every_pass() {
        crate::test_utils::init_test_logging(None);
        let ctx = context();
        let tree = Pipeline::build(
            &ctx,
            &input(
                r#"
                [shared]
                port = "80"

                [server]
                "-" = "shared"
                host = "example.com"
                url = "http://{{ .host }}:{{ .port }}"
                "#,
            ),
        )
        .unwrap();

        assert_eq!(
            tree.find(&path!["server", "url"]).unwrap().scalar(),
            Some(&Scalar::from("http://example.com:80"))
        );
        tree.walk(|_, node| {
            if let Some(text) = node.scalar().and_then(Scalar::as_str) {
                assert!(!contains_markers(text));
            }
        });
    }

    #[test]
    fn test_build_propagates_splice_errors() {
        let err = Pipeline::build(&context(), &input("[t]\n\"-\" = \"nope\"")).unwrap_err();
        assert!(matches!(err, ConftreeError::SpliceTargetMissing { .. }));
    }

    #[test]
    fn test_project_promotes_then_narrows() {
        let tree = Pipeline::build(
            &context(),
            &input("[env.prod]\nhost = 'p'\n[env.prod.db]\nname = 'd'"),
        )
        .unwrap();

        let promoted = Pipeline::project(tree.clone(), &[path!["env", "prod"]], None).unwrap();
        assert!(promoted.contains(&path!["host"]));
        assert!(promoted.contains(&path!["env"]));

        let narrowed =
            Pipeline::project(tree, &[path!["env", "prod"]], Some(&path!["db"])).unwrap();
        assert_eq!(narrowed.child_labels(), vec!["name"]);
    }

    #[test]
    fn test_project_missing_promotion_is_fatal() {
        let tree = Node::root();
        let err = Pipeline::project(tree, &[path!["nope"]], None).unwrap_err();
        assert!(matches!(err, ConftreeError::PathNotFound { .. }));
    }

    #[test]
    fn test_query_and_render_text() {
        let ctx = context();
        let tree = Pipeline::build(&ctx, &input("[a]\nb = 'x'\nc = '{{ .b }}y'")).unwrap();

        assert_eq!(Pipeline::query(&ctx, &tree, "a.c").unwrap(), "xy");
        assert_eq!(Pipeline::query(&ctx, &tree, ".a.b").unwrap(), "x");
        assert_eq!(Pipeline::render_text(&ctx, &tree, "b={{ .a.b }}").unwrap(), "b=x");
    }

    #[test]
    fn test_query_rejects_ambiguous_path() {
        let ctx = context();
        let tree = Node::root();
        assert!(matches!(
            Pipeline::query(&ctx, &tree, "a.01"),
            Err(ConftreeError::AmbiguousPathSegment { .. })
        ));
    }
}
