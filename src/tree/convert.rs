//! Conversion between [`Node`] trees and nested TOML values.
//!
//! Ingestion walks a nested value and stores each scalar with [`Node::add`],
//! creating empty composites with [`Node::ensure`] so that empty tables and
//! arrays survive. Projection is a direct recursion over the typed node kinds.

use toml::{Table, Value};

use super::{Node, NodeKind, Path, PathSegment, Scalar};
use crate::constants::ROOT_LABEL;

/// The nested structure exchanged with sources, the evaluator and exporters.
pub type NestedValue = Value;

impl Node {
    /// Build a new tree from a nested value.
    ///
    /// A scalar at the top level is stored under the root label, so the result
    /// is always a composite.
    pub fn from_structure(value: &NestedValue) -> Self {
        let mut root = Self::root();
        root.ingest(value);
        root
    }

    /// Build a new tree from a TOML table.
    pub fn from_table(table: &Table) -> Self {
        let mut root = Self::root();
        let mut path = Path::root();
        for (key, value) in table {
            path.push(PathSegment::name(key.as_str()));
            root.ingest_at(&mut path, value);
            path.pop();
        }
        root
    }

    /// Merge a nested value into this node.
    pub fn ingest(&mut self, value: &NestedValue) {
        let mut path = Path::root();
        self.ingest_at(&mut path, value);
    }

    fn ingest_at(&mut self, path: &mut Path, value: &NestedValue) {
        match value {
            Value::Table(table) => {
                if table.is_empty() {
                    self.ensure(path, NodeKind::Map);
                }
                for (key, child) in table {
                    path.push(PathSegment::name(key.as_str()));
                    self.ingest_at(path, child);
                    path.pop();
                }
            }
            Value::Array(items) => {
                if items.is_empty() {
                    self.ensure(path, NodeKind::List);
                }
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    self.ingest_at(path, item);
                    path.pop();
                }
            }
            scalar => {
                let Some(scalar) = Scalar::from_toml(scalar) else {
                    return;
                };
                if path.is_root() {
                    self.add(&Path::root().child(ROOT_LABEL), scalar);
                } else {
                    self.add(path, scalar);
                }
            }
        }
    }

    /// Project this node into a nested value.
    ///
    /// Map children with a repeated label keep their first occurrence; list
    /// items are emitted in stored order.
    pub fn to_value(&self) -> NestedValue {
        match self.kind() {
            NodeKind::Scalar(scalar) => scalar.to_toml(),
            NodeKind::List => Value::Array(self.children().iter().map(Node::to_value).collect()),
            NodeKind::Map => {
                let mut table = Table::new();
                for child in self.children() {
                    let key = child.label().to_string();
                    if !table.contains_key(&key) {
                        table.insert(key, child.to_value());
                    }
                }
                Value::Table(table)
            }
        }
    }

    /// Project this node into a nested value wrapped under its own label.
    ///
    /// For a tree built from sources this is `{ root = { ... } }`; callers that
    /// want the top-level table use [`Node::to_value`] instead.
    pub fn to_structure(&self) -> NestedValue {
        let mut wrapper = Table::new();
        wrapper.insert(self.label().to_string(), self.to_value());
        Value::Table(wrapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    fn parse(text: &str) -> Value {
        Value::Table(text.parse::<Table>().unwrap())
    }

    #[test]
    fn test_round_trip() {
        let value = parse(
            r#"
            title = "demo"
            ratio = 0.5
            enabled = true
            when = 1979-05-27T07:32:00Z
            empty_table = {}
            empty_list = []

            [server]
            host = "localhost"
            ports = [80, 443]
            nested = [[1, 2], []]

            [[users]]
            name = "a"

            [[users]]
            name = "b"
            tags = ["x"]
            "#,
        );

        let tree = Node::from_structure(&value);
        assert_eq!(tree.to_value(), value);

        let Value::Table(wrapped) = tree.to_structure() else {
            panic!("structure is not a table");
        };
        assert_eq!(wrapped.get(ROOT_LABEL), Some(&value));
    }

    #[test]
    fn test_ingest_uses_source_segment_kinds() {
        let tree = Node::from_structure(&parse("[codes]\n404 = \"missing\"\nlist = [\"a\"]"));

        assert!(tree.find(&path!["codes", "404"]).is_ok());
        assert!(tree.find(&path!["codes", 404]).is_err());
        assert!(tree.find(&path!["codes", "list", 0]).is_ok());
        assert!(tree.find(&path!["codes", "list"]).unwrap().is_list());
    }

    #[test]
    fn test_top_level_scalar_is_stored_under_root_label() {
        let tree = Node::from_structure(&Value::Integer(7));
        assert_eq!(tree.find(&path![ROOT_LABEL]).unwrap().scalar(), Some(&Scalar::Integer(7)));
    }

    #[test]
    fn test_duplicate_labels_keep_first() {
        let tree = Node::root()
            .with_child(Node::leaf("a", "first"))
            .with_child(Node::leaf("a", "second"));

        let value = tree.to_value();
        assert_eq!(value.get("a").and_then(Value::as_str), Some("first"));
    }
}
