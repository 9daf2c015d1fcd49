//! Loading configuration sources.
//!
//! A configuration is assembled from TOML files and inline TOML texts. Every
//! source is a layer; layers are deep-merged in order:
//!
//! 1. files, in declaration order
//! 2. inline texts, in declaration order
//!
//! Later layers win. Tables merge key by key; any other value, arrays
//! included, is replaced as a whole.
//!
//! ```text
//! base.toml        prod.toml          -T 'server.port = 9000'
//! [server]         [server]
//! host = "a"       host = "b"
//! port = 80
//!                      => server = { host = "b", port = 9000 }
//! ```

use futures::future::try_join_all;
use std::path::PathBuf;
use tokio::fs as async_fs;
use toml::{Table, Value};

use crate::core::ConftreeError;
use crate::tree::NestedValue;

/// Read, parse and merge all sources into one nested value.
///
/// Files are read concurrently; merging follows declaration order.
///
/// # Errors
///
/// - [`ConftreeError::SourceRead`] when a file cannot be read
/// - [`ConftreeError::SourceParse`] when a source is not a valid TOML table
pub async fn load_sources(
    files: &[PathBuf],
    texts: &[String],
) -> Result<NestedValue, ConftreeError> {
    let reads = files.iter().map(|file| async move {
        async_fs::read_to_string(file).await.map(|content| (file, content)).map_err(|source| {
            ConftreeError::SourceRead {
                file: file.display().to_string(),
                source,
            }
        })
    });
    let contents = try_join_all(reads).await?;

    let mut merged = Table::new();
    for (file, content) in &contents {
        let layer = parse_layer(content, &file.display().to_string())?;
        tracing::debug!("source: merging {} ({} keys)", file.display(), layer.len());
        deep_merge(&mut merged, layer);
    }
    for (index, text) in texts.iter().enumerate() {
        let layer = parse_layer(text, &format!("inline text #{}", index + 1))?;
        tracing::debug!("source: merging inline text #{} ({} keys)", index + 1, layer.len());
        deep_merge(&mut merged, layer);
    }

    tracing::info!("loaded {} files and {} inline texts", files.len(), texts.len());
    Ok(Value::Table(merged))
}

fn parse_layer(content: &str, source_name: &str) -> Result<Table, ConftreeError> {
    content.parse::<Table>().map_err(|e| ConftreeError::SourceParse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

/// Merge `layer` over `base`: tables recursively, anything else replaced.
pub fn deep_merge(base: &mut Table, layer: Table) {
    for (key, value) in layer {
        if let Value::Table(incoming) = value {
            if let Some(Value::Table(existing)) = base.get_mut(&key) {
                deep_merge(existing, incoming);
                continue;
            }
            base.insert(key, Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Expand `~` and environment variables in a user-supplied path.
///
/// # Errors
///
/// Returns [`ConftreeError::Other`] when a referenced variable is not set.
pub fn expand_path(path: &str) -> Result<PathBuf, ConftreeError> {
    shellexpand::full(path)
        .map(|expanded| PathBuf::from(expanded.into_owned()))
        .map_err(|e| ConftreeError::Other {
            message: format!("Cannot expand path '{path}': {e}"),
        })
}

/// Expand a user-supplied source path and make it absolute.
///
/// Existing files are canonicalized so that every spelling of a path (relative,
/// through symlinks) names the same source. A missing file is only made
/// absolute against the working directory; reading it reports the error.
pub async fn resolve_source_path(file: &str) -> Result<PathBuf, ConftreeError> {
    let expanded = expand_path(file)?;
    match async_fs::canonicalize(&expanded).await {
        Ok(canonical) => Ok(canonical),
        Err(e) => {
            tracing::debug!("cannot canonicalize {}: {}", expanded.display(), e);
            Ok(std::path::absolute(&expanded)?)
        }
    }
}
