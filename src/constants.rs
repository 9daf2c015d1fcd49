//! Global constants used throughout the conftree codebase.
//!
//! Reserved names, file locations and evaluation limits that are shared by
//! more than one module live here so their values stay consistent.

/// Label of the root node of every tree built from sources.
///
/// Also the key under which [`Node::to_structure`](crate::tree::Node::to_structure)
/// wraps the projected value.
pub const ROOT_LABEL: &str = "root";

/// Map key that marks a splice entry.
pub const SPLICE_KEY: &str = "-";

/// Template markers. A string leaf containing any of them is not final yet.
pub const TEMPLATE_MARKERS: [&str; 3] = ["{{", "{%", "{#"];

/// Reserved template variable holding the whole projected structure.
///
/// References such as `.a.b` are looked up through this variable so that keys
/// which are not valid template identifiers (`my-key`, `0`) still resolve.
pub const TREE_VARIABLE: &str = "__tree";

/// Upper bound on render rounds for a single leaf (8 levels of nesting with room to spare).
pub const DEFAULT_MAX_RENDER_ITERATIONS: usize = 32;

/// Shell used by the `sh` and `shpipe` template helpers.
pub const DEFAULT_SHELL: &str = "bash";

/// Name of the directory holding settings and cached results.
pub const APP_DIR_NAME: &str = "conftree";

/// File name of the global settings file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// File extension of cached results.
pub const CACHE_FILE_EXTENSION: &str = "toml";
