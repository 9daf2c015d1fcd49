//! Path addressing for the configuration tree.
//!
//! A [`Path`] is an ordered list of [`PathSegment`]s, each either a map key
//! ([`PathSegment::Name`]) or a list position ([`PathSegment::Index`]). Paths
//! built during ingestion carry the segment kind of the source structure, so a
//! TOML key made only of digits stays a `Name` inside the tree.
//!
//! The dotted string form (`servers.0.host`) is lossy: when parsing, a segment
//! made only of ASCII digits always becomes an `Index`. This convention is kept
//! for compatibility with user-facing queries, promotions and template
//! references.
//!
//! # Examples
//!
//! ```rust
//! use conftree::tree::{Path, PathSegment};
//!
//! let path = Path::parse("servers.0.host").unwrap();
//! assert_eq!(path.segments()[1], PathSegment::Index(0));
//! assert_eq!(path.to_string(), "servers.0.host");
//! ```

use std::fmt;

use crate::core::ConftreeError;

/// A single step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A map key.
    Name(String),
    /// A list position.
    Index(usize),
}

impl PathSegment {
    /// Create a name segment.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Parse one dotted-form segment.
    ///
    /// All-digit segments become indices. Empty segments and zero-padded
    /// digit runs (`01`) cannot be mapped without guessing and are rejected
    /// with [`ConftreeError::AmbiguousPathSegment`].
    pub fn parse(segment: &str, whole: &str) -> Result<Self, ConftreeError> {
        if segment.is_empty() {
            return Err(ConftreeError::AmbiguousPathSegment {
                path: whole.to_string(),
                segment: segment.to_string(),
                reason: "empty segment".to_string(),
            });
        }

        if segment.bytes().all(|b| b.is_ascii_digit()) {
            if segment.len() > 1 && segment.starts_with('0') {
                return Err(ConftreeError::AmbiguousPathSegment {
                    path: whole.to_string(),
                    segment: segment.to_string(),
                    reason: "zero-padded number is neither a stable index nor a name".to_string(),
                });
            }
            return segment.parse::<usize>().map(Self::Index).map_err(|_| {
                ConftreeError::AmbiguousPathSegment {
                    path: whole.to_string(),
                    segment: segment.to_string(),
                    reason: "index out of range".to_string(),
                }
            });
        }

        Ok(Self::Name(segment.to_string()))
    }

    /// Returns `true` for [`PathSegment::Index`].
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// The key if this is a name segment.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// An address of a node, relative to the root of a tree.
///
/// The empty path addresses the root itself and displays as `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The root path.
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments.
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse the dotted string form.
    ///
    /// `""` and `"."` both parse to the root path. A single leading dot is
    /// accepted (`.a.b` is the same as `a.b`), which is the form used by
    /// template references.
    ///
    /// # Errors
    ///
    /// Returns [`ConftreeError::AmbiguousPathSegment`] for empty or
    /// zero-padded numeric segments.
    pub fn parse(dotted: &str) -> Result<Self, ConftreeError> {
        let trimmed = dotted.strip_prefix('.').unwrap_or(dotted);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        trimmed
            .split('.')
            .map(|segment| PathSegment::parse(segment, dotted))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when this path addresses the root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// The first segment, if any.
    pub fn first(&self) -> Option<&PathSegment> {
        self.0.first()
    }

    /// The path without its last segment. The root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }

    /// A new path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// A new path with `other` appended.
    #[must_use]
    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Returns `true` if `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build a [`Path`] from a mix of names and indices.
///
/// ```rust
/// use conftree::path;
///
/// let p = path!["servers", 0, "host"];
/// assert_eq!(p.to_string(), "servers.0.host");
/// ```
#[macro_export]
macro_rules! path {
    () => { $crate::tree::Path::root() };
    ($($segment:expr),+ $(,)?) => {
        $crate::tree::Path::new(vec![$($crate::tree::PathSegment::from($segment)),+])
    };
}
