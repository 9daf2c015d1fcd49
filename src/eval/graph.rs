//! Reference graph between templated leaves.
//!
//! Nodes are the string leaves that still contain template markers. An edge
//! `L -> D` records that leaf `L` references a node that is `D` or contains
//! `D`, so `D` has to reach its final value before `L` is rendered. Cycles are
//! detected structurally before anything is rendered.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::core::ConftreeError;
use crate::templating::{contains_markers, references};
use crate::tree::{Node, Path};

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Dependency graph between templated leaves.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    /// The underlying directed graph.
    graph: DiGraph<Path, ()>,
    /// Map from leaf paths to their graph indices.
    node_map: HashMap<Path, NodeIndex>,
    /// Pre-render text of every leaf, for error reports.
    texts: HashMap<Path, String>,
}

impl ReferenceGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every templated string leaf of `tree`.
    ///
    /// A reference resolves against the root when the root has its first
    /// segment, otherwise against the leaf's enclosing scope. This mirrors the
    /// scope promotion applied to the render context. References that do not
    /// resolve add no edge.
    pub fn build(tree: &Node) -> Self {
        let mut graph = Self::new();

        let templated: Vec<(Path, String)> = tree
            .leaves()
            .into_iter()
            .filter_map(|(path, scalar)| {
                scalar.as_str().filter(|text| contains_markers(text)).map(|text| (path, text.to_string()))
            })
            .collect();

        for (path, text) in &templated {
            graph.add_leaf(path.clone(), text.clone());
        }

        for (path, text) in &templated {
            let scope = tree.enclosing_scope(path);
            for reference in references(text) {
                let Some(target) = Self::resolve(tree, &scope, &reference) else {
                    tracing::debug!("graph: '{}' references unresolved '{}'", path, reference);
                    continue;
                };

                for (dependency, _) in templated.iter().filter(|(leaf, _)| leaf.starts_with(&target)) {
                    graph.add_reference(path.clone(), dependency.clone());
                }
            }
        }

        tracing::debug!(
            "graph: {} templated leaves, {} references",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    fn resolve(tree: &Node, scope: &Path, reference: &Path) -> Option<Path> {
        let first = reference.first()?;
        let base = if scope.is_root() || tree.child(first).is_some() {
            Path::root()
        } else {
            scope.clone()
        };
        let target = base.join(reference);
        tree.contains(&target).then_some(target)
    }

    /// Add a leaf to the graph if it doesn't already exist.
    fn add_leaf(&mut self, leaf: Path, text: String) -> NodeIndex {
        self.texts.insert(leaf.clone(), text);
        self.ensure_node(leaf)
    }

    fn ensure_node(&mut self, leaf: Path) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&leaf) {
            index
        } else {
            let index = self.graph.add_node(leaf.clone());
            self.node_map.insert(leaf, index);
            index
        }
    }

    /// Record that `from` references `to`, meaning `to` must be evaluated first.
    pub fn add_reference(&mut self, from: Path, to: Path) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Detect reference cycles using DFS with colors.
    ///
    /// Returns an error naming the whole chain, closed by its first leaf
    /// (`a -> b -> a`), if a cycle exists.
    pub fn detect_cycles(&self) -> Result<(), ConftreeError> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|node| (node, Color::White)).collect();
        let mut path: Vec<Path> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                let leaf = cycle.first().cloned().unwrap_or_default();
                return Err(ConftreeError::NonTerminatingEvaluation {
                    path: leaf.to_string(),
                    text: self.texts.get(&leaf).cloned().unwrap_or_default(),
                    cycle: cycle.iter().map(ToString::to_string).collect(),
                });
            }
        }

        Ok(())
    }

    /// DFS visit for cycle detection.
    ///
    /// Returns `Some(cycle_path)` if a cycle is detected, None otherwise.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<Path>,
    ) -> Option<Vec<Path>> {
        colors.insert(node, Color::Gray);
        path.push(self.graph[node].clone());

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let cycle_start =
                        path.iter().position(|p| *p == self.graph[neighbor]).unwrap_or(0);
                    let mut cycle = path[cycle_start..].to_vec();
                    cycle.push(self.graph[neighbor].clone());
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Leaves in evaluation order: every leaf comes after the leaves it references.
    pub fn evaluation_order(&self) -> Result<Vec<Path>, ConftreeError> {
        self.detect_cycles()?;

        let indices = toposort(&self.graph, None).map_err(|cycle| {
            let leaf = self.graph[cycle.node_id()].clone();
            ConftreeError::NonTerminatingEvaluation {
                path: leaf.to_string(),
                text: self.texts.get(&leaf).cloned().unwrap_or_default(),
                cycle: vec![leaf.to_string()],
            }
        })?;

        Ok(indices.into_iter().rev().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Leaves referenced directly by `leaf`.
    pub fn direct_references(&self, leaf: &Path) -> Vec<Path> {
        self.node_map
            .get(leaf)
            .map(|&idx| self.graph.neighbors(idx).map(|n| self.graph[n].clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
