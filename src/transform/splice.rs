//! Splice resolution.
//!
//! A table key named `-` splices shared fragments into the table or array that
//! holds it. Its value is a dotted path, or an array of paths:
//!
//! ```toml
//! [shared.defaults]
//! retries = 3
//!
//! [service]
//! name = "api"
//! "-" = "shared.defaults"     # service gains `retries`
//!
//! [shared]
//! base = ["a", "b"]
//!
//! [build]
//! steps = [{ "-" = ["shared.base"] }, "c"]   # steps = ["a", "b", "c"]
//! ```
//!
//! - A table whose only key is `-` and which is itself an array element is
//!   replaced in place by the elements of every target (targets must be arrays).
//! - Otherwise the `-` key is removed and the entries of every target (targets
//!   must be tables) are appended to the table that held it.
//!
//! Targets are deep-copied. Resolution repeats until no `-` key is left, so a
//! splice copied out of a target is resolved as well.
//!
//! Before anything is copied, the `-` entries are checked for inclusion
//! cycles: an entry whose target contains the entry itself, directly or
//! through other entries, would be copied forever. Including the same
//! fragment more than once (`a` includes `b` and `c`, both include `d`) is
//! fine.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::constants::SPLICE_KEY;
use crate::core::ConftreeError;
use crate::tree::{Node, NodeKind, Path, PathSegment};

/// Result of splice resolution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpliceResult {
    /// Number of `-` entries resolved
    pub splices_resolved: usize,
    /// Number of nodes copied into place
    pub nodes_inserted: usize,
}

/// Resolve every splice entry of `tree`, in pre-order.
///
/// # Errors
///
/// - [`ConftreeError::SpliceTargetMissing`] when a target path does not exist
/// - [`ConftreeError::KindMismatch`] for malformed `-` values and targets of
///   the wrong kind
/// - [`ConftreeError::CyclicSplice`] when a target contains its own splice, or
///   when splices include each other
pub fn resolve_splices(tree: &mut Node) -> Result<SpliceResult, ConftreeError> {
    check_inclusion_cycles(tree)?;

    let mut result = SpliceResult::default();
    while let Some(splice) = next_splice(tree) {
        let inserted = resolve_splice(tree, &splice)?;
        result.splices_resolved += 1;
        result.nodes_inserted += inserted;
    }

    if result.splices_resolved > 0 {
        tracing::info!(
            "resolved {} splices ({} nodes inserted)",
            result.splices_resolved,
            result.nodes_inserted
        );
    }
    Ok(result)
}

/// Every `-` entry of `tree`, in pre-order.
fn all_splices(tree: &Node) -> Vec<Path> {
    let key = PathSegment::name(SPLICE_KEY);
    let mut splices = Vec::new();
    tree.walk(|path, _| {
        if path.last() == Some(&key) {
            splices.push(path.clone());
        }
    });
    splices
}

/// Reject `-` entries that would include themselves.
///
/// Each entry is a graph node. An edge `S -> S'`, labelled with a target of
/// `S`, means that target contains `S'`, so resolving `S` copies `S'` along.
/// Every strongly connected component with an internal edge (a self-loop
/// included) is an inclusion cycle. Missing targets add no edges; they are
/// reported when the entry is resolved.
fn check_inclusion_cycles(tree: &Node) -> Result<(), ConftreeError> {
    let splices = all_splices(tree);
    let mut graph: DiGraph<Path, Path> = DiGraph::new();
    let indices: Vec<NodeIndex> = splices.iter().map(|splice| graph.add_node(splice.clone())).collect();

    for (&from, splice) in indices.iter().zip(&splices) {
        for target in splice_targets(tree.find(splice)?, splice)? {
            for (&to, included) in indices.iter().zip(&splices) {
                if included.starts_with(&target) {
                    graph.add_edge(from, to, target.clone());
                }
            }
        }
    }

    for component in tarjan_scc(&graph) {
        for &node in &component {
            if let Some(edge) = graph.edges(node).find(|edge| component.contains(&edge.target())) {
                return Err(ConftreeError::CyclicSplice {
                    splice: graph[node].to_string(),
                    target: edge.weight().to_string(),
                });
            }
        }
    }

    tracing::debug!("splice: {} entries, {} inclusions", graph.node_count(), graph.edge_count());
    Ok(())
}

/// The first `-` entry in pre-order.
fn next_splice(tree: &Node) -> Option<Path> {
    all_splices(tree).into_iter().next()
}

/// Dotted target paths declared by a `-` entry.
fn splice_targets(node: &Node, splice: &Path) -> Result<Vec<Path>, ConftreeError> {
    let mismatch = |found: &str| ConftreeError::KindMismatch {
        path: splice.to_string(),
        expected: "string or array of strings".to_string(),
        found: found.to_string(),
    };

    let texts: Vec<&str> = match node.kind() {
        NodeKind::Scalar(scalar) => {
            vec![scalar.as_str().ok_or_else(|| mismatch(scalar.kind_name()))?]
        }
        NodeKind::List => node
            .children()
            .iter()
            .map(|item| match item.scalar().and_then(|s| s.as_str()) {
                Some(text) => Ok(text),
                None => Err(mismatch(item.kind().name())),
            })
            .collect::<Result<_, _>>()?,
        NodeKind::Map => return Err(mismatch("map")),
    };

    texts.into_iter().map(Path::parse).collect()
}

fn resolve_splice(tree: &mut Node, splice: &Path) -> Result<usize, ConftreeError> {
    let holder_path = splice.parent();
    let targets = splice_targets(tree.find(splice)?, splice)?;

    let holder = tree.find(&holder_path)?;
    let list_parent = holder_path.parent();
    let in_place = holder.children().len() == 1
        && holder_path.last().is_some_and(PathSegment::is_index)
        && tree.find(&list_parent).is_ok_and(Node::is_list);
    let expected = if in_place {
        NodeKind::List
    } else {
        NodeKind::Map
    };

    let mut inserted = Vec::new();
    for target in &targets {
        let source = tree.find(target).map_err(|_| ConftreeError::SpliceTargetMissing {
            splice: splice.to_string(),
            target: target.to_string(),
        })?;
        if *source.kind() != expected {
            return Err(ConftreeError::KindMismatch {
                path: target.to_string(),
                expected: expected.name().to_string(),
                found: source.kind().name().to_string(),
            });
        }

        tracing::debug!(
            "splice: '{}' <- '{}' ({} entries)",
            splice,
            target,
            source.children().len()
        );
        inserted.extend(source.children().iter().cloned());
    }

    let count = inserted.len();
    if in_place {
        let Some(PathSegment::Index(index)) = holder_path.last().cloned() else {
            return Ok(0);
        };
        let list = tree.find_mut(&list_parent)?;
        let replaced: Vec<Node> = list.children_mut().splice(index..=index, inserted).collect();
        tracing::debug!("splice: replaced {} list element at '{}'", replaced.len(), holder_path);
        list.renumber();
    } else {
        tree.remove(splice)?;
        tree.find_mut(&holder_path)?.children_mut().extend(inserted);
    }
    Ok(count)
}
