//! Cache of evaluated configurations.
//!
//! Evaluating a configuration can run shell commands, so the fully evaluated
//! structure (before promotion and narrowing) is stored on disk and reused
//! while its sources are unchanged.
//!
//! # Layout
//!
//! ```text
//! ~/.cache/conftree/
//! ├── 3f1c...9a.toml    # one evaluated structure per cache key
//! └── 7b02...e4.toml
//! ```
//!
//! The key is derived from the source files and inline texts with
//! [`cache_key`]. An entry is fresh when none of its source files was modified
//! after the entry was written, see [`ConfigCache::is_fresh`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use conftree::cache::{ConfigCache, cache_key};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), conftree::core::ConftreeError> {
//! let files = vec![PathBuf::from("app.toml")];
//! let cache = ConfigCache::new(PathBuf::from("/tmp/conftree"));
//! let key = cache_key(&files, &[]);
//!
//! if let Some((value, written)) = cache.get(&key).await?
//!     && ConfigCache::is_fresh(&files, written).await
//! {
//!     println!("{value}");
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::PathBuf;
use tokio::fs as async_fs;
use tokio::task::JoinSet;
use toml::Value;

use crate::constants::CACHE_FILE_EXTENSION;
use crate::core::ConftreeError;
use crate::tree::NestedValue;

/// Derive the cache key for a set of sources.
///
/// The key is the SHA-256 of the sorted file paths and inline texts, each
/// tagged with its kind and terminated by a NUL byte. Declaring the same
/// sources in another order yields the same key.
pub fn cache_key(files: &[PathBuf], texts: &[String]) -> String {
    let mut parts: Vec<String> = files
        .iter()
        .map(|file| format!("file:{}", file.display()))
        .chain(texts.iter().map(|text| format!("text:{text}")))
        .collect();
    parts.sort();

    let mut hasher = Sha256::new();
    for part in &parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Write `content` to a uniquely named temporary file in `dir` and rename it
/// over `path`, so concurrent writers never share a partial file.
fn write_entry(dir: &std::path::Path, path: &std::path::Path, content: &str) -> Result<(), ConftreeError> {
    let cache_error = |operation: &str, e: std::io::Error| ConftreeError::Cache {
        operation: operation.to_string(),
        message: format!("{}: {e}", path.display()),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| cache_error("write", e))?;
    temp.write_all(content.as_bytes()).map_err(|e| cache_error("write", e))?;
    temp.persist(path).map_err(|e| cache_error("rename", e.error))?;
    Ok(())
}

/// On-disk store of evaluated structures.
#[derive(Debug, Clone)]
pub struct ConfigCache {
    dir: PathBuf,
}

impl ConfigCache {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{CACHE_FILE_EXTENSION}"))
    }

    /// Read the entry for `key` together with the time it was written.
    ///
    /// Missing entries are `None`. Entries that cannot be read or parsed are
    /// logged and treated as missing, so a broken entry is simply rebuilt.
    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<(NestedValue, DateTime<Utc>)>, ConftreeError> {
        let path = self.entry_path(key);
        if !async_fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("cache miss: {}", key);
            return Ok(None);
        }

        let written = match async_fs::metadata(&path).await.and_then(|meta| meta.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                tracing::warn!("ignoring cache entry {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("ignoring unreadable cache entry {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        match content.parse::<toml::Table>() {
            Ok(table) => {
                tracing::debug!("cache hit: {} (written {})", key, written.to_rfc3339());
                Ok(Some((Value::Table(table), written)))
            }
            Err(e) => {
                tracing::warn!("ignoring corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// The entry is written to a temporary file first and renamed into place.
    pub async fn put(&self, key: &str, value: &NestedValue) -> Result<(), ConftreeError> {
        let Value::Table(table) = value else {
            return Err(ConftreeError::Cache {
                operation: "write".to_string(),
                message: format!("only tables can be cached, got {}", value.type_str()),
            });
        };
        let content = toml::to_string(table).map_err(|e| ConftreeError::Cache {
            operation: "serialize".to_string(),
            message: e.to_string(),
        })?;

        async_fs::create_dir_all(&self.dir).await.map_err(|e| ConftreeError::Cache {
            operation: "create directory".to_string(),
            message: format!("{}: {e}", self.dir.display()),
        })?;

        let dir = self.dir.clone();
        let path = self.entry_path(key);
        let stored = path.clone();
        tokio::task::spawn_blocking(move || write_entry(&dir, &path, &content))
            .await
            .map_err(|e| ConftreeError::Cache {
                operation: "write".to_string(),
                message: e.to_string(),
            })??;

        tracing::debug!("cache store: {}", stored.display());
        Ok(())
    }

    /// Check that no file in `files` changed after `written`.
    ///
    /// Every file is checked on its own task. The first stale file (modified
    /// later, or whose metadata cannot be read) aborts the remaining checks.
    pub async fn is_fresh(files: &[PathBuf], written: DateTime<Utc>) -> bool {
        let mut set = JoinSet::new();
        for file in files {
            let file = file.clone();
            set.spawn(async move {
                let modified = async_fs::metadata(&file).await.and_then(|meta| meta.modified());
                match modified {
                    Ok(modified) => {
                        let modified = DateTime::<Utc>::from(modified);
                        if modified > written {
                            tracing::debug!(
                                "stale: {} modified {}",
                                file.display(),
                                modified.to_rfc3339()
                            );
                            false
                        } else {
                            true
                        }
                    }
                    Err(e) => {
                        tracing::debug!("stale: cannot stat {}: {}", file.display(), e);
                        false
                    }
                }
            });
        }

        while let Some(join_result) = set.join_next().await {
            match join_result {
                Ok(true) => {}
                Ok(false) => {
                    set.abort_all();
                    return false;
                }
                Err(e) => {
                    tracing::warn!("freshness check failed: {}", e);
                    set.abort_all();
                    return false;
                }
            }
        }
        true
    }
}
