//! Command-line interface for conftree.
//!
//! A single command assembles a configuration from TOML sources, evaluates it
//! and prints the requested outputs:
//!
//! ```bash
//! # Evaluate two files and print the result as TOML
//! conftree -t base.toml -t prod.toml -o toml
//!
//! # Export one environment as shell variables
//! conftree -t envs.toml -p env.prod -o shell
//!
//! # Query a single value, or render a template file
//! conftree -t app.toml -q server.url
//! conftree -t app.toml -r nginx.conf.tmpl
//! ```
//!
//! Outputs are printed in a fixed order: the view selected with `-o`, every
//! `-r` render target, the `-q` query, then the `-R` render string.
//!
//! # Execution
//!
//! 1. Load settings ([`GlobalConfig`]) and initialise logging
//! 2. Reuse the cached evaluation when it is still fresh, otherwise load the
//!    sources and run the [`Pipeline`]
//! 3. Apply promotions and narrowing
//! 4. Print outputs
//!
//! Evaluation and rendering can run shell commands, so they run on the
//! blocking thread pool.


use anyhow::{Context, Result};
use clap::Parser;
use futures::future::try_join_all;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::cache::{ConfigCache, cache_key};
use crate::config::GlobalConfig;
use crate::pipeline::{EngineContext, Pipeline};
use crate::source::{expand_path, load_sources, resolve_source_path};
use crate::tree::{NestedValue, Node, Path};
use crate::view::{OutputKind, render_view};

/// Logging and settings derived from the command line.
///
/// Separated from [`Cli`] so tests can inspect what a set of flags resolves
/// to without touching the process-wide subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG`
    pub log_level: Option<String>,

    /// Settings file override
    pub config_path: Option<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Without an explicit level, `RUST_LOG` is honoured and warnings are
    /// shown otherwise. Only the first call has an effect.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Hierarchical TOML configuration with cross-references and templates.
#[derive(Parser, Debug)]
#[command(
    name = "conftree",
    about = "Evaluate layered TOML configuration with templated cross-references",
    version,
    author,
    long_about = "conftree merges TOML files and inline TOML, splices shared fragments, \
                  resolves {{ .dotted.path }} references between values and prints the \
                  result as TOML, shell variables, key lists or rendered templates."
)]
pub struct Cli {
    /// Add a TOML file to the configuration (repeatable, later files win)
    #[arg(short = 't', long = "toml", value_name = "FILE")]
    toml_files: Vec<String>,

    /// Add inline TOML text (repeatable, wins over files)
    #[arg(short = 'T', long = "text", value_name = "TOML")]
    toml_texts: Vec<String>,

    /// Promote a table to the top level (repeatable, applied in order)
    #[arg(short = 'p', long = "promote", value_name = "PATH")]
    promotions: Vec<String>,

    /// Render a template file against the configuration (repeatable)
    #[arg(short = 'r', long = "render", value_name = "FILE")]
    render_targets: Vec<String>,

    /// Print the configuration in this format
    #[arg(short = 'o', long = "output", value_enum, value_name = "KIND")]
    output: Option<OutputKind>,

    /// Print the value at a dotted path
    #[arg(short = 'q', long = "query", value_name = "PATH")]
    query: Option<String>,

    /// Render a template string against the configuration
    #[arg(short = 'R', long = "render-string", value_name = "TEXT")]
    render_string: Option<String>,

    /// Narrow the configuration to the table at a dotted path before output
    #[arg(short = 'n', long = "narrow", value_name = "PATH")]
    narrow: Option<String>,

    /// Do not read or write the evaluation cache
    #[arg(short = 'c', long = "skip-cache")]
    skip_cache: bool,

    /// Log every evaluation step to stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Path to the settings file (default: ~/.conftree/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<String>,
}

impl Cli {
    /// Execute the command with logging set up from the flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        CliConfig {
            log_level: self.verbose.then(|| "conftree=debug".to_string()),
            config_path: self.config.clone(),
        }
    }

    /// Execute the command with an explicit [`CliConfig`].
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        let settings_path = config.config_path.as_deref().map(expand_path).transpose()?;
        let settings = GlobalConfig::load_with_optional(settings_path)
            .await
            .context("Failed to load settings")?;
        let ctx = EngineContext::with_settings(settings.engine_settings());

        let files = try_join_all(self.toml_files.iter().map(|file| resolve_source_path(file))).await?;

        let cache = if settings.cache && !self.skip_cache {
            Some(ConfigCache::new(settings.cache_dir()?))
        } else {
            None
        };

        let tree = self.evaluate(&ctx, &files, cache.as_ref()).await?;
        let tree = self.project(tree)?;
        let output = self.render_outputs(&ctx, tree).await?;
        print!("{output}");
        Ok(())
    }

    /// The evaluated tree, from the cache when possible.
    async fn evaluate(
        &self,
        ctx: &EngineContext,
        files: &[PathBuf],
        cache: Option<&ConfigCache>,
    ) -> Result<Node> {
        let key = cache_key(files, &self.toml_texts);

        if let Some(cache) = cache
            && let Some((value, written)) = cache.get(&key).await?
        {
            if ConfigCache::is_fresh(files, written).await {
                tracing::info!("using cached evaluation {}", key);
                return Ok(Node::from_structure(&value));
            }
            tracing::info!("cached evaluation {} is stale", key);
        }

        let input = load_sources(files, &self.toml_texts).await?;
        let tree = build_blocking(ctx, input).await?;

        if let Some(cache) = cache
            && let Err(e) = cache.put(&key, &tree.to_value()).await
        {
            tracing::warn!("could not cache evaluation: {}", e);
        }
        Ok(tree)
    }

    fn project(&self, tree: Node) -> Result<Node> {
        let promotions = self
            .promotions
            .iter()
            .map(|promotion| Path::parse(promotion))
            .collect::<Result<Vec<_>, _>>()?;
        let narrow = self.narrow.as_deref().map(Path::parse).transpose()?;

        Ok(Pipeline::project(tree, &promotions, narrow.as_ref())?)
    }

    /// Every requested output, concatenated in print order.
    async fn render_outputs(&self, ctx: &EngineContext, tree: Node) -> Result<String> {
        let targets =
            try_join_all(self.render_targets.iter().map(|file| read_render_target(file))).await?;

        let ctx = ctx.clone();
        let output = self.output;
        let query = self.query.clone();
        let render_string = self.render_string.clone();

        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut out = String::new();

            if let Some(kind) = output {
                out.push_str(&render_view(&tree, kind)?);
            }
            for target in &targets {
                out.push_str(&Pipeline::render_text(&ctx, &tree, target)?);
                out.push('\n');
            }
            if let Some(query) = &query {
                out.push_str(&Pipeline::query(&ctx, &tree, query)?);
                out.push('\n');
            }
            if let Some(text) = &render_string {
                out.push_str(&Pipeline::render_text(&ctx, &tree, text)?);
                out.push('\n');
            }
            Ok(out)
        })
        .await
        .context("Render task failed")?
    }
}

async fn read_render_target(file: &str) -> Result<String> {
    let path = expand_path(file)?;
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read render target {}", path.display()))
}

/// Run [`Pipeline::build`] on the blocking thread pool.
async fn build_blocking(ctx: &EngineContext, input: NestedValue) -> Result<Node> {
    let ctx = ctx.clone();
    let tree = tokio::task::spawn_blocking(move || Pipeline::build(&ctx, &input))
        .await
        .context("Evaluation task failed")??;
    Ok(tree)
}
