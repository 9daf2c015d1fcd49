//! Path-addressable configuration tree.
//!
//! The tree is the working representation of a configuration while it moves
//! through the pipeline: it is built once from the merged sources, mutated in
//! place by the splice, qualification and evaluation passes, and finally
//! narrowed or promoted before being projected out by the [`view`](crate::view)
//! layer.
//!
//! # Node Model
//!
//! Every [`Node`] carries a label (the map key or list index under which it
//! lives in its parent) and a [`NodeKind`]:
//!
//! - [`NodeKind::Map`]: children are labelled with [`PathSegment::Name`]
//! - [`NodeKind::List`]: children are labelled `Index(0..n)`, contiguous
//! - [`NodeKind::Scalar`]: a leaf holding a [`Scalar`]; never has children
//!
//! Because maps, lists and scalars are all nodes, every location is found with
//! the same [`Node::find`] call regardless of what it holds.
//!
//! # Ownership
//!
//! Children are owned exclusively by their parent. Operations that copy
//! content between locations (splicing, promotion, narrowing) deep-clone the
//! subtree, so the tree is acyclic at all times.
//!
//! # Examples
//!
//! ```rust
//! use conftree::path;
//! use conftree::tree::{Node, Scalar};
//!
//! let mut root = Node::root();
//! root.add(&path!["a", "b"], "x");
//!
//! let node = root.find(&path!["a", "b"]).unwrap();
//! assert_eq!(node.scalar(), Some(&Scalar::from("x")));
//! ```

mod convert;
pub mod path;
mod scalar;


pub use convert::NestedValue;
pub use path::{Path, PathSegment};
pub use scalar::Scalar;

use crate::constants::ROOT_LABEL;
use crate::core::ConftreeError;

/// What a node holds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A table of named children.
    Map,
    /// An ordered list of indexed children.
    List,
    /// A terminal value.
    Scalar(Scalar),
}

impl NodeKind {
    /// A short name of the kind, used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::List => "list",
            Self::Scalar(scalar) => scalar.kind_name(),
        }
    }

    /// The container kind able to hold children addressed by `segment`.
    fn container_for(segment: &PathSegment) -> Self {
        if segment.is_index() {
            Self::List
        } else {
            Self::Map
        }
    }
}

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    label: PathSegment,
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    /// Create a childless node.
    pub fn new(label: impl Into<PathSegment>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind,
            children: Vec::new(),
        }
    }

    /// Create an empty root map.
    pub fn root() -> Self {
        Self::new(ROOT_LABEL, NodeKind::Map)
    }

    /// Create a leaf.
    pub fn leaf(label: impl Into<PathSegment>, value: impl Into<Scalar>) -> Self {
        Self::new(label, NodeKind::Scalar(value.into()))
    }

    /// Builder-style helper that appends a child and keeps list numbering intact.
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        if self.is_list() {
            self.renumber();
        }
        self
    }

    pub fn label(&self) -> &PathSegment {
        &self.label
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// A leaf is a node holding a scalar.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, NodeKind::Map)
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, NodeKind::List)
    }

    /// Maps and lists are composites, even when empty.
    pub fn is_composite(&self) -> bool {
        !self.is_leaf()
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// The first child whose label equals `segment`.
    pub fn child(&self, segment: &PathSegment) -> Option<&Node> {
        self.children.iter().find(|child| child.label == *segment)
    }

    /// Labels of the direct children, in order.
    pub fn child_labels(&self) -> Vec<String> {
        self.children.iter().map(|child| child.label.to_string()).collect()
    }

    fn position(&self, segment: &PathSegment) -> Option<usize> {
        self.children.iter().position(|child| child.label == *segment)
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Replace the payload of a leaf. Composite nodes are left untouched.
    pub(crate) fn set_scalar(&mut self, value: Scalar) {
        if self.is_leaf() {
            self.kind = NodeKind::Scalar(value);
        }
    }

    /// Relabel list children `0..n` in their current order.
    pub(crate) fn renumber(&mut self) {
        for (index, child) in self.children.iter_mut().enumerate() {
            child.label = PathSegment::Index(index);
        }
    }

    /// Descend into (or create) the child at `segment`.
    ///
    /// Leaves and empty composites adopt the container kind matching the
    /// segment, so later writes can turn a scalar into a table or list.
    fn child_or_insert(&mut self, segment: &PathSegment) -> &mut Node {
        if self.is_leaf() || self.children.is_empty() {
            let kind = NodeKind::container_for(segment);
            if self.kind != kind {
                tracing::debug!("add: '{}' becomes a {}", self.label, kind.name());
                self.kind = kind;
            }
        }

        let index = match self.position(segment) {
            Some(index) => index,
            None => {
                tracing::debug!("add: new node '{}' on '{}'", segment, self.label);
                self.children.push(Node::new(segment.clone(), NodeKind::Map));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Store `value` at `path`, creating intermediate containers as needed.
    ///
    /// Existing nodes along the path are reused, so adding to a path twice
    /// overwrites the scalar instead of duplicating it. An empty path is
    /// ignored.
    pub fn add(&mut self, path: &Path, value: impl Into<Scalar>) {
        let value = value.into();
        let Some((last, parents)) = path.segments().split_last() else {
            tracing::debug!("add: ignoring empty path on '{}'", self.label);
            return;
        };

        let mut current = self;
        for segment in parents {
            current = current.child_or_insert(segment);
        }

        let target = current.child_or_insert(last);
        target.kind = NodeKind::Scalar(value);
        target.children.clear();
    }

    /// Make sure a composite of `kind` exists at `path`.
    ///
    /// Existing composites are kept as they are; a leaf at `path` is replaced
    /// by an empty container.
    pub fn ensure(&mut self, path: &Path, kind: NodeKind) {
        let mut current = self;
        for segment in path.segments() {
            current = current.child_or_insert(segment);
        }
        if current.is_leaf() || (current.children.is_empty() && current.kind != kind) {
            current.kind = kind;
            current.children.clear();
        }
    }

    /// Locate the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConftreeError::PathNotFound`] naming the first segment that
    /// has no matching child, together with the labels that were available at
    /// that level.
    pub fn find(&self, path: &Path) -> Result<&Node, ConftreeError> {
        let mut current = self;
        for (depth, segment) in path.segments().iter().enumerate() {
            current = match current.child(segment) {
                Some(child) => child,
                None => return Err(Self::not_found(path, depth, current)),
            };
        }
        Ok(current)
    }

    /// Mutable variant of [`Node::find`].
    pub fn find_mut(&mut self, path: &Path) -> Result<&mut Node, ConftreeError> {
        let mut current = self;
        for (depth, segment) in path.segments().iter().enumerate() {
            let index = match current.position(segment) {
                Some(index) => index,
                None => return Err(Self::not_found(path, depth, current)),
            };
            current = &mut current.children[index];
        }
        Ok(current)
    }

    fn not_found(path: &Path, depth: usize, at: &Node) -> ConftreeError {
        ConftreeError::PathNotFound {
            path: path.to_string(),
            missing: Path::new(path.segments()[..=depth].to_vec()).to_string(),
            available: at.child_labels(),
        }
    }

    /// Returns `true` if a node exists at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.find(path).is_ok()
    }

    /// Detach and return the node at `path`.
    ///
    /// Removing a list element renumbers the remaining elements.
    ///
    /// # Errors
    ///
    /// A missing path is a [`ConftreeError::PathNotFound`]; the root itself
    /// cannot be removed.
    pub fn remove(&mut self, path: &Path) -> Result<Node, ConftreeError> {
        let Some(last) = path.last() else {
            return Err(ConftreeError::InvalidOperation {
                operation: "remove".to_string(),
                path: path.to_string(),
                reason: "the root cannot be removed".to_string(),
            });
        };

        let parent = self.find_mut(&path.parent())?;
        let index = match parent.position(last) {
            Some(index) => index,
            None => return Err(Self::not_found(path, path.len() - 1, parent)),
        };

        let removed = parent.children.remove(index);
        if parent.is_list() {
            parent.renumber();
        }
        tracing::debug!("remove: '{}'", path);
        Ok(removed)
    }

    /// Visit every node in pre-order, parents before children.
    ///
    /// Paths are relative to `self`; `self` is visited with the root path.
    pub fn walk<F>(&self, mut visitor: F)
    where
        F: FnMut(&Path, &Node),
    {
        let mut path = Path::root();
        self.walk_inner(&mut path, &mut visitor);
    }

    fn walk_inner<F>(&self, path: &mut Path, visitor: &mut F)
    where
        F: FnMut(&Path, &Node),
    {
        visitor(path, self);
        for child in &self.children {
            path.push(child.label.clone());
            child.walk_inner(path, visitor);
            path.pop();
        }
    }

    /// Rewrite every leaf with the value returned by `visitor`.
    ///
    /// Leaves are offered in pre-order; composites are only traversed. A
    /// leaf is updated only when the returned value differs. The first error
    /// returned by the visitor stops the traversal.
    pub fn change_leaves<F>(&mut self, mut visitor: F) -> Result<(), ConftreeError>
    where
        F: FnMut(&Path, &Scalar) -> Result<Scalar, ConftreeError>,
    {
        let mut path = Path::root();
        self.change_leaves_inner(&mut path, &mut visitor)
    }

    fn change_leaves_inner<F>(&mut self, path: &mut Path, visitor: &mut F) -> Result<(), ConftreeError>
    where
        F: FnMut(&Path, &Scalar) -> Result<Scalar, ConftreeError>,
    {
        if let NodeKind::Scalar(current) = &self.kind {
            let updated = visitor(path, current)?;
            if updated != *current {
                tracing::debug!("update: '{}' '{}' -> '{}'", path, current, updated);
                self.kind = NodeKind::Scalar(updated);
            }
            return Ok(());
        }

        for child in &mut self.children {
            path.push(child.label.clone());
            let result = child.change_leaves_inner(path, visitor);
            path.pop();
            result?;
        }
        Ok(())
    }

    /// All leaves with their paths, in pre-order.
    pub fn leaves(&self) -> Vec<(Path, Scalar)> {
        let mut leaves = Vec::new();
        self.walk(|path, node| {
            if let Some(scalar) = node.scalar() {
                leaves.push((path.clone(), scalar.clone()));
            }
        });
        leaves
    }

    /// The nearest ancestor of `path` that is a map.
    ///
    /// This is the lexical scope of a leaf: for a value inside a table it is
    /// that table, for a list element it is the table owning the list.
    pub fn enclosing_scope(&self, path: &Path) -> Path {
        let mut scope = path.parent();
        loop {
            if scope.is_root() {
                return scope;
            }
            if matches!(self.find(&scope), Ok(node) if node.is_map()) {
                return scope;
            }
            scope.pop();
        }
    }

    /// Merge the children of the subtree at `path` into this node.
    ///
    /// Children are appended without deduplication; on later lookups the
    /// existing (earlier) child with a colliding label wins.
    ///
    /// # Errors
    ///
    /// - [`ConftreeError::PathNotFound`] when `path` does not exist
    /// - [`ConftreeError::NotComposite`] when `path` holds a scalar
    /// - [`ConftreeError::KindMismatch`] when a list would be merged into a
    ///   map or the other way round
    pub fn promote(&mut self, path: &Path) -> Result<(), ConftreeError> {
        let source = self.find(path)?;
        if source.is_leaf() {
            return Err(ConftreeError::NotComposite {
                operation: "promote".to_string(),
                path: path.to_string(),
                kind: source.kind.name().to_string(),
            });
        }
        if source.kind != self.kind {
            return Err(ConftreeError::KindMismatch {
                path: path.to_string(),
                expected: self.kind.name().to_string(),
                found: source.kind.name().to_string(),
            });
        }

        let promoted = source.children.clone();
        tracing::debug!("promote: '{}' ({} entries)", path, promoted.len());
        self.children.extend(promoted);
        if self.is_list() {
            self.renumber();
        }
        Ok(())
    }

    /// Re-root this tree at the subtree found at `path`.
    ///
    /// # Errors
    ///
    /// [`ConftreeError::PathNotFound`] for a missing path and
    /// [`ConftreeError::NotComposite`] when the target is a scalar.
    pub fn narrow(&mut self, path: &Path) -> Result<(), ConftreeError> {
        let target = self.find(path)?;
        if target.is_leaf() {
            return Err(ConftreeError::NotComposite {
                operation: "narrow".to_string(),
                path: path.to_string(),
                kind: target.kind.name().to_string(),
            });
        }
        let narrowed = target.clone();
        tracing::debug!("narrow: '{}'", path);
        *self = narrowed;
        Ok(())
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::root()
    }
}
