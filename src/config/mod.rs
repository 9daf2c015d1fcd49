//! Configuration management for conftree
//!
//! conftree reads one optional settings file per user. It controls the
//! evaluator (render iteration cap, shell for the shell helpers) and the
//! cache of evaluated configurations. See [`GlobalConfig`] for the format and
//! its location.
//!
//! Command-line flags win over settings: `--skip-cache` disables the cache
//! even when `cache = true`, and `--config` replaces the default location.

pub mod global;

pub use global::GlobalConfig;
