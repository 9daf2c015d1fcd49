//! Test utilities for conftree
//!
//! Helpers shared by unit tests and the integration suite: one-time logging
//! setup and small constructors for trees written as TOML.
//!
//! # Example
//!
//! ```rust,no_run
//! use conftree::test_utils::{init_test_logging, tree_from_toml};
//!
//! init_test_logging(None);
//! let tree = tree_from_toml("[a]\nb = 1").unwrap();
//! assert!(tree.contains(&conftree::path!["a", "b"]));
//! ```

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::ConftreeError;
use crate::tree::Node;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=conftree=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Build a tree from a TOML document.
pub fn tree_from_toml(text: &str) -> Result<Node, ConftreeError> {
    let table: toml::Table = text.parse().map_err(|e: toml::de::Error| ConftreeError::SourceParse {
        source_name: "test document".to_string(),
        message: e.to_string(),
    })?;
    Ok(Node::from_table(&table))
}
