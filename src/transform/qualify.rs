//! Identifier qualification.
//!
//! Values refer to their siblings by relative name (`{{ .port }}` inside
//! `[server]`), but the evaluator resolves references from the root. This pass
//! rewrites relative references into fully-qualified ones (`{{ .server.port }}`).
//!
//! A candidate is a `.seg(.seg)*` run that follows `{{` or whitespace. It is
//! left untouched when:
//!
//! 1. its first segment is the leaf's own key (a self reference),
//! 2. its first segment is not a key of the enclosing table, or
//! 3. the qualified path resolves to a table or array.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::ConftreeError;
use crate::tree::{Node, Path, Scalar};

static CANDIDATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\{\{|\s)((?:\.[A-Za-z0-9_-]+)+)").expect("candidate pattern is valid")
});

/// Qualify the relative references of every string leaf of `tree`.
///
/// Decisions are taken against a snapshot of the tree taken before the pass,
/// so rewriting one leaf never influences another. Returns the number of
/// leaves that changed.
pub fn qualify(tree: &mut Node) -> Result<usize, ConftreeError> {
    let snapshot = tree.clone();
    let mut changed = 0;

    tree.change_leaves(|path, scalar| {
        let Some(text) = scalar.as_str() else {
            return Ok(scalar.clone());
        };

        let qualified = qualify_text(&snapshot, path, text);
        if qualified == text {
            Ok(scalar.clone())
        } else {
            changed += 1;
            Ok(Scalar::String(qualified))
        }
    })?;

    tracing::info!("qualified references in {} values", changed);
    Ok(changed)
}

/// Rewrite the relative references in `text`, the value of the leaf at `leaf`.
pub fn qualify_text(tree: &Node, leaf: &Path, text: &str) -> String {
    let scope = tree.enclosing_scope(leaf);
    if scope.is_root() {
        return text.to_string();
    }
    let Ok(scope_node) = tree.find(&scope) else {
        return text.to_string();
    };

    let mut result = text.to_string();
    let mut delta: isize = 0;

    for captures in CANDIDATE_PATTERN.captures_iter(text) {
        let Some(candidate) = captures.get(2) else {
            continue;
        };

        let relative = match Path::parse(candidate.as_str()) {
            Ok(relative) => relative,
            Err(e) => {
                tracing::debug!("qualify: '{}' skipping '{}': {}", leaf, candidate.as_str(), e);
                continue;
            }
        };
        let Some(first) = relative.first() else {
            continue;
        };

        if leaf.last() == Some(first) {
            tracing::debug!("qualify: '{}' '{}' is a self reference", leaf, candidate.as_str());
            continue;
        }
        if scope_node.child(first).is_none() {
            tracing::debug!("qualify: '{}' '{}' is not a sibling", leaf, candidate.as_str());
            continue;
        }

        let qualified = scope.join(&relative);
        if tree.find(&qualified).is_ok_and(Node::is_composite) {
            tracing::debug!(
                "qualify: '{}' '{}' refers to a composite, left as is",
                leaf,
                candidate.as_str()
            );
            continue;
        }

        let replacement = format!(".{qualified}");
        let start = candidate.start().saturating_add_signed(delta);
        let end = candidate.end().saturating_add_signed(delta);
        result.replace_range(start..end, &replacement);
        delta += replacement.len() as isize - candidate.len() as isize;

        tracing::debug!("qualify: '{}' '{}' -> '{}'", leaf, candidate.as_str(), replacement);
    }

    result
}
