//! Scoped lookup of explicit child builders.
//!
//! While a relation (or entity) builder is generated through the standard
//! path, relative paths inside its subtree are answered by its own children
//! instead of the model defaults. Each scope is a [`ResolverFrame`] living on
//! the caller's stack; the [`FetchResolverChain`] handed to nested calls only
//! borrows it, so a scope ends exactly when the call that created it returns,
//! on success and error alike.
//!
//! ```text
//! root entity "e"        frame 0   (children: manager)
//!   manager "m"          frame 1   (children: name, department)
//!     department "d"     frame 2   <- innermost, answers lookups
//! ```
//!
//! Only the innermost frame is consulted; outer frames are kept for depth and
//! diagnostics.

use crate::domain_model::CollectionNature;
use crate::mapping::entity_builder::EntityResultBuilder;
use crate::mapping::fetch_builder::{FetchBuilder, RelationFetchBuilder};

/// Builder whose children answer lookups for one scope.
#[derive(Debug, Clone, Copy)]
pub enum ResolverScope<'a> {
    Relation(&'a RelationFetchBuilder),
    Entity(&'a EntityResultBuilder),
    /// Entity builder nested under a relation builder. Both child maps answer;
    /// a name may be declared in only one of them.
    Delegated {
        relation: &'a RelationFetchBuilder,
        entity: &'a EntityResultBuilder,
    },
}

impl<'a> ResolverScope<'a> {
    pub fn table_alias(&self) -> &'a str {
        match self {
            ResolverScope::Relation(r) => r.table_alias(),
            ResolverScope::Entity(e) => e.table_alias(),
            ResolverScope::Delegated { relation, .. } => relation.table_alias(),
        }
    }

    pub fn find_child(&self, relation: &str) -> Option<&'a FetchBuilder> {
        match self {
            ResolverScope::Relation(r) => r.find_child(relation),
            ResolverScope::Entity(e) => e.find_child(relation),
            ResolverScope::Delegated {
                relation: r,
                entity,
            } => entity.find_child(relation).or_else(|| r.find_child(relation)),
        }
    }

    pub fn child_names(&self) -> Vec<&'a str> {
        match self {
            ResolverScope::Relation(r) => r.children().iter().map(|(name, _)| name).collect(),
            ResolverScope::Entity(e) => e.children().iter().map(|(name, _)| name).collect(),
            ResolverScope::Delegated { relation, entity } => entity
                .children()
                .iter()
                .chain(relation.children().iter())
                .map(|(name, _)| name)
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct ResolverFrame<'a> {
    scope: ResolverScope<'a>,
    strip_nature: bool,
    parent: FetchResolverChain<'a>,
}

impl<'a> ResolverFrame<'a> {
    /// Chain with this frame innermost.
    pub fn chain(&'a self) -> FetchResolverChain<'a> {
        FetchResolverChain { head: Some(self) }
    }

    pub fn scope(&self) -> ResolverScope<'a> {
        self.scope
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchResolverChain<'a> {
    head: Option<&'a ResolverFrame<'a>>,
}

impl<'a> FetchResolverChain<'a> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// New frame nested inside this chain. `strip_nature` removes a leading
    /// `element.` / `index.` segment before lookup, for collection scopes.
    pub fn frame(self, scope: ResolverScope<'a>, strip_nature: bool) -> ResolverFrame<'a> {
        ResolverFrame {
            scope,
            strip_nature,
            parent: self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.head;
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent.head;
        }
        depth
    }

    /// Look up the explicit builder for `relative_path` in the innermost scope.
    pub fn resolve(&self, relative_path: &str) -> Option<&'a FetchBuilder> {
        let frame = self.head?;
        let name = if frame.strip_nature {
            strip_nature_prefix(relative_path)
        } else {
            relative_path
        };
        let found = frame.scope.find_child(name);
        if found.is_some() {
            log::trace!(
                "Resolved '{}' through scope '{}' (depth {})",
                relative_path,
                frame.scope.table_alias(),
                self.depth()
            );
        }
        found
    }
}

fn strip_nature_prefix(path: &str) -> &str {
    for nature in CollectionNature::ALL {
        if let Some(rest) = path
            .strip_prefix(nature.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        {
            return rest;
        }
    }
    path
}
