//! Output views of an evaluated tree.
//!
//! Most views are built from [`flatten`], a sorted mapping of dotted key to
//! value. Values inside arrays have no stable dotted key and are left out of
//! the flattened views; use [`OutputKind::Toml`] to see them.

use clap::ValueEnum;
use std::collections::BTreeMap;
use toml::Value;

use crate::core::ConftreeError;
use crate::tree::{Node, PathSegment};

/// The views available on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// The whole tree as a TOML document
    Toml,
    /// Sorted dotted keys, one per line
    Keys,
    /// Shell variable assignments
    Shell,
    /// `key: value` lines
    Flat,
}

/// Flatten the leaves of `tree` into dotted keys.
///
/// Leaves below an array are skipped. When two leaves share a key, the first
/// one in tree order wins.
pub fn flatten(tree: &Node) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    for (path, scalar) in tree.leaves() {
        if path.segments().iter().any(PathSegment::is_index) {
            continue;
        }
        flat.entry(path.to_string()).or_insert_with(|| scalar.to_string());
    }
    flat
}

/// Render `tree` in the requested view.
pub fn render_view(tree: &Node, kind: OutputKind) -> Result<String, ConftreeError> {
    match kind {
        OutputKind::Toml => render_toml(tree),
        OutputKind::Keys => Ok(flatten(tree).into_keys().map(|key| key + "\n").collect()),
        OutputKind::Shell => Ok(flatten(tree)
            .into_iter()
            .map(|(key, value)| format!("{}='{}'\n", shell_name(&key), value.replace('\'', r"'\''")))
            .collect()),
        OutputKind::Flat => Ok(flatten(tree)
            .into_iter()
            .map(|(key, value)| format!("{key}: {value}\n"))
            .collect()),
    }
}

fn render_toml(tree: &Node) -> Result<String, ConftreeError> {
    let value = tree.to_value();
    let Value::Table(table) = value else {
        return Err(ConftreeError::Export {
            format: "toml".to_string(),
            message: format!("the top level is {}, not a table", tree.kind().name()),
        });
    };

    toml::to_string(&table).map_err(|e| ConftreeError::Export {
        format: "toml".to_string(),
        message: e.to_string(),
    })
}

/// A dotted key as a shell variable name.
fn shell_name(key: &str) -> String {
    key.replace(['.', '-'], "_")
}
