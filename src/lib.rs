//! conftree - hierarchical TOML configuration engine
//!
//! conftree assembles a configuration from layered TOML sources and lets values
//! refer to each other with template expressions. A value such as
//! `"http://{{ .host }}:{{ .port }}"` is rewritten until every reference has
//! been replaced by the final text of the value it names.
//!
//! # Architecture Overview
//!
//! Every run goes through the same passes, each relying on the previous one:
//!
//! ```text
//! sources -> ingest -> splice -> qualify -> evaluate -> promote/narrow -> view
//! ```
//!
//! 1. **Sources** ([`source`]): TOML files and inline texts are deep-merged,
//!    later layers winning.
//! 2. **Ingest** ([`tree`]): the merged structure becomes a [`tree::Node`]
//!    tree of maps, lists and scalars addressed by [`tree::Path`]s.
//! 3. **Splice** ([`transform::splice`]): `"-"` keys copy shared fragments into
//!    the table or array that holds them.
//! 4. **Qualify** ([`transform::qualify`]): references relative to the
//!    enclosing table are rewritten into root-relative ones.
//! 5. **Evaluate** ([`eval`]): templated values are rendered in dependency
//!    order; reference cycles are reported before anything is rendered.
//! 6. **Promote / narrow** ([`pipeline`]): tables are lifted to the top level
//!    or the tree is re-rooted.
//! 7. **View** ([`view`]): TOML, shell assignments, key lists or rendered
//!    templates.
//!
//! # Core Modules
//!
//! ## Engine
//! - [`tree`] - Node tree, paths, scalar values and conversion from/to TOML
//! - [`transform`] - Splice resolution and identifier qualification
//! - [`eval`] - Reference graph and the evaluation loop
//! - [`templating`] - Template rendering with Tera and the shell helpers
//! - [`pipeline`] - Engine context and the ordered passes
//! - [`view`] - Flattening and output formats
//!
//! ## Supporting Modules
//! - [`source`] - Loading and merging TOML sources
//! - [`cache`] - On-disk cache of evaluated configurations
//! - [`config`] - Global settings (`~/.conftree/config.toml`)
//! - [`core`] - Error types and user-facing error reporting
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```toml
//! [shared.defaults]
//! retries = 3
//!
//! [server]
//! "-" = "shared.defaults"
//! host = "example.com"
//! port = 8080
//! url = "http://{{ .host }}:{{ .port }}"
//!
//! [client]
//! endpoint = "{{ .server.url }}/api"
//! retries = "{{ .shared.defaults.retries }}"
//! ```
//!
//! ```bash
//! $ conftree -t app.toml -q client.endpoint
//! http://example.com:8080/api
//!
//! $ conftree -t app.toml -n server -o shell
//! host='example.com'
//! port='8080'
//! retries='3'
//! url='http://example.com:8080'
//! ```

// Engine
pub mod eval;
pub mod pipeline;
pub mod templating;
pub mod transform;
pub mod tree;
pub mod view;

// Supporting modules
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod source;

// Test utilities (only compiled with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
