//! Global user settings for conftree.
//!
//! Settings live in a small TOML file:
//!
//! - **Unix/macOS**: `~/.conftree/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\conftree\config.toml`
//!
//! The location can be overridden on the command line with `--config`. Every
//! field is optional and a missing file yields the defaults.
//!
//! ```toml
//! # Upper bound of render rounds for a single value
//! max_render_iterations = 32
//!
//! # Shell used by the sh() function and the shpipe filter
//! shell = "bash"
//!
//! # Where evaluated configurations are cached (~ and $VARS are expanded)
//! cache_dir = "~/.cache/conftree"
//!
//! # Set to false to never read or write the cache
//! cache = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_MAX_RENDER_ITERATIONS, DEFAULT_SHELL};
use crate::core::ConftreeError;
use crate::pipeline::EngineSettings;
use crate::source::expand_path;

const fn default_max_render_iterations() -> usize {
    DEFAULT_MAX_RENDER_ITERATIONS
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

const fn default_cache() -> bool {
    true
}

/// Global configuration structure for conftree.
///
/// # Examples
///
/// ```rust,no_run
/// use conftree::config::GlobalConfig;
///
/// let config: GlobalConfig = toml::from_str("shell = 'sh'").unwrap();
/// assert_eq!(config.shell, "sh");
/// assert_eq!(config.max_render_iterations, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Upper bound of render rounds for a single value.
    #[serde(default = "default_max_render_iterations")]
    pub max_render_iterations: usize,

    /// Shell used by the template shell helpers.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Cache directory override.
    ///
    /// Defaults to `conftree` under the platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    /// Whether evaluated configurations are cached at all.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_render_iterations: default_max_render_iterations(),
            shell: default_shell(),
            cache_dir: None,
            cache: default_cache(),
        }
    }
}

impl GlobalConfig {
    /// Load the configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!("no settings file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds invalid settings.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        tracing::debug!("loaded settings from {}", path.display());
        Ok(config)
    }

    /// Default settings file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory (or the local data directory on
    /// Windows) cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join(APP_DIR_NAME)
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(format!(".{APP_DIR_NAME}"))
        };

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// The directory holding cached configurations.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(expand_path(dir)?);
        }

        dirs::cache_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| anyhow::anyhow!("Unable to determine cache directory"))
    }

    /// Settings for the build pipeline.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_render_iterations: self.max_render_iterations,
            shell: self.shell.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConftreeError> {
        if self.max_render_iterations == 0 {
            return Err(ConftreeError::Config {
                message: "max_render_iterations must be at least 1".to_string(),
            });
        }
        if self.shell.trim().is_empty() {
            return Err(ConftreeError::Config {
                message: "shell must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_global_config_default() {
        let config = GlobalConfig::default();
        assert_eq!(config.max_render_iterations, 32);
        assert_eq!(config.shell, "bash");
        assert!(config.cache);
        assert!(config.cache_dir.is_none());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        tokio::fs::write(&config_path, "shell = 'sh'\ncache = false\n").await.unwrap();

        let config = GlobalConfig::load_from(&config_path).await.unwrap();
        assert_eq!(config.shell, "sh");
        assert!(!config.cache);
        assert_eq!(config.max_render_iterations, 32);
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();

        let config =
            GlobalConfig::load_with_optional(Some(temp.path().join("missing.toml"))).await.unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        tokio::fs::write(&config_path, "max_render_iterations = 0\n").await.unwrap();

        let err = GlobalConfig::load_from(&config_path).await.unwrap_err();
        assert!(err.chain().any(|cause| cause.to_string().contains("max_render_iterations")));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        tokio::fs::write(&config_path, "shell = [").await.unwrap();

        assert!(GlobalConfig::load_from(&config_path).await.is_err());
    }

    #[test]
    fn test_cache_dir_override_is_expanded() {
        let temp = TempDir::new().unwrap();
        let config = GlobalConfig {
            cache_dir: Some(temp.path().join("cache").display().to_string()),
            ..GlobalConfig::default()
        };

        assert_eq!(config.cache_dir().unwrap(), temp.path().join("cache"));
    }

    #[test]
    fn test_engine_settings() {
        let config = GlobalConfig {
            max_render_iterations: 4,
            shell: "sh".to_string(),
            ..GlobalConfig::default()
        };

        let settings = config.engine_settings();
        assert_eq!(settings.max_render_iterations, 4);
        assert_eq!(settings.shell, "sh");
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        let path = GlobalConfig::default_path().unwrap();
        assert!(path.ends_with("config.toml"));
    }
}
