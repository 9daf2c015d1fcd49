//! Template markers and dotted references inside template blocks.
//!
//! Values refer to each other with a leading-dot path inside a template block:
//!
//! ```text
//! url = "http://{{ .server.host }}:{{ .server.port }}"
//! ```
//!
//! A reference is a run of `.segment` groups that starts right after the block
//! opening, after whitespace, or after one of `(`, `[`, `,`, `=`. The last
//! rule keeps attribute access on ordinary template variables (`loop.index`)
//! from being mistaken for a reference.
//!
//! Before rendering, [`translate`] rewrites every reference into a lookup
//! through the reserved [`TREE_VARIABLE`] followed by a `default` filter, so
//! keys that are not template identifiers resolve and missing keys render as
//! an empty string.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::constants::{TEMPLATE_MARKERS, TREE_VARIABLE};
use crate::tree::{Path, PathSegment};

/// `{{ ... }}` and `{% ... %}` blocks, non-greedy, spanning lines.
static BLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("block pattern is valid")
});

/// A reference inside a block, with the character or opening that precedes it.
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\{\{-?|\{%-?|[\s(\[,=])((?:\.[A-Za-z0-9_-]+)+)").expect("reference pattern is valid")
});

/// Returns `true` if `text` still contains a template marker.
pub fn contains_markers(text: &str) -> bool {
    TEMPLATE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// All references in the template blocks of `text`, in order of appearance.
///
/// References with segments that cannot be parsed (`.01`) are skipped.
pub fn references(text: &str) -> Vec<Path> {
    BLOCK_PATTERN
        .find_iter(text)
        .flat_map(|block| {
            REFERENCE_PATTERN
                .captures_iter(block.as_str())
                .filter_map(|caps| Path::parse(&caps[2]).ok())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Rewrite the references of `text` into lookups the evaluator understands.
///
/// `{{ .a.b-c.0 }}` becomes `{{ __tree["a"]["b-c"][0] | default(value="") }}`.
/// Text outside template blocks is left untouched.
pub fn translate(text: &str) -> String {
    BLOCK_PATTERN
        .replace_all(text, |block: &Captures<'_>| {
            REFERENCE_PATTERN
                .replace_all(&block[0], |caps: &Captures<'_>| match Path::parse(&caps[2]) {
                    Ok(path) => format!("{}{}", &caps[1], lookup_expression(&path)),
                    Err(_) => caps[0].to_string(),
                })
                .into_owned()
        })
        .into_owned()
}

/// The bracket lookup of `path` through the tree variable.
fn lookup_expression(path: &Path) -> String {
    let mut expression = TREE_VARIABLE.to_string();
    for segment in path.segments() {
        match segment {
            PathSegment::Name(name) => {
                expression.push_str("[\"");
                expression.push_str(&name.replace('\\', "\\\\").replace('"', "\\\""));
                expression.push_str("\"]");
            }
            PathSegment::Index(index) => expression.push_str(&format!("[{index}]")),
        }
    }
    expression.push_str(" | default(value=\"\")");
    expression
}
