//! Relation paths
//!
//! A [`RelationPath`] names a node of an assembly plan by the chain of
//! relations walked from a root result: `e.manager.address.city`. The root
//! segment is the table alias of the root result, which keeps paths unique
//! when the same entity appears more than once in one result set.

use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationPath {
    segments: Vec<String>,
}

impl RelationPath {
    /// Path of a root result registered under `alias`.
    pub fn root(alias: &str) -> Self {
        RelationPath {
            segments: vec![alias.to_string()],
        }
    }

    /// Extend the path by a relation name.
    ///
    /// Dotted names (`address.city`) contribute one segment per part, so a
    /// property declared by its embedded path lands at the same position as
    /// the component generated by the default path.
    pub fn append(&self, relation: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            relation
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        RelationPath { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(RelationPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Last segment: the relation name, or the alias for a root path.
    pub fn local_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// True when `other` strictly extends this path.
    pub fn is_proper_prefix_of(&self, other: &RelationPath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Dotted remainder of `self` below `ancestor`, if `ancestor` is a proper prefix.
    pub fn relative_to(&self, ancestor: &RelationPath) -> Option<String> {
        if !ancestor.is_proper_prefix_of(self) {
            return None;
        }
        Some(self.segments[ancestor.segments.len()..].join("."))
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl Serialize for RelationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
