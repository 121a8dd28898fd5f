//! Assembly plan
//!
//! The executable output of a compilation: one [`DomainResult`] per declared
//! root result, each a tree of [`Fetch`] nodes reading shared
//! [`SqlSelection`]s. Plans are immutable once built and are shared through
//! `Arc` by the plan cache.

use std::sync::Arc;

use serde::Serialize;

use crate::assembly::selection::SqlSelection;
use crate::domain_model::RelationPath;
use crate::utils::{serde_arc, serde_arc_vec};

/// Whether a fetch is materialized from the current row or only carries the
/// key needed to load it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTiming {
    Immediate,
    Delayed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "fetch", rename_all = "snake_case")]
pub enum Fetch {
    Basic(BasicFetch),
    Embedded(EmbeddedFetch),
    Entity(EntityFetch),
    Collection(CollectionFetch),
}

impl Fetch {
    pub fn path(&self) -> &RelationPath {
        match self {
            Fetch::Basic(f) => &f.path,
            Fetch::Embedded(f) => &f.path,
            Fetch::Entity(f) => &f.path,
            Fetch::Collection(f) => &f.path,
        }
    }

    /// Relation name this fetch is attached under.
    pub fn name(&self) -> &str {
        self.path().local_name()
    }

    pub fn timing(&self) -> FetchTiming {
        match self {
            Fetch::Basic(_) | Fetch::Embedded(_) => FetchTiming::Immediate,
            Fetch::Entity(f) => f.timing,
            Fetch::Collection(f) => f.timing,
        }
    }

    /// Every selection read by this fetch, children included.
    pub fn selections(&self) -> Vec<Arc<SqlSelection>> {
        let mut out = Vec::new();
        self.collect_selections(&mut out);
        out
    }

    fn collect_selections(&self, out: &mut Vec<Arc<SqlSelection>>) {
        match self {
            Fetch::Basic(f) => out.push(f.selection.clone()),
            Fetch::Embedded(f) => out.extend(f.components.iter().map(|c| c.selection.clone())),
            Fetch::Entity(f) => f.collect_selections(out),
            Fetch::Collection(f) => {
                out.extend(f.key.iter().cloned());
                out.extend(f.index.iter().cloned());
                match &f.element {
                    Some(CollectionElementFetch::Basic(basic)) => out.push(basic.selection.clone()),
                    Some(CollectionElementFetch::Entity(entity)) => entity.collect_selections(out),
                    None => {}
                }
            }
        }
    }
}

/// A single column of the owner's row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicFetch {
    pub path: RelationPath,
    #[serde(serialize_with = "serde_arc::serialize")]
    pub selection: Arc<SqlSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedComponentFetch {
    pub name: String,
    #[serde(serialize_with = "serde_arc::serialize")]
    pub selection: Arc<SqlSelection>,
}

/// An embeddable value assembled from several columns of the owner's row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedFetch {
    pub path: RelationPath,
    pub components: Vec<EmbeddedComponentFetch>,
}

/// A to-one association, or the entity element of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityFetch {
    pub path: RelationPath,
    pub entity: String,
    pub timing: FetchTiming,
    /// Joined alias the target is read from; `None` for delayed fetches
    pub table_alias: Option<String>,
    /// Foreign key on the owner side
    #[serde(serialize_with = "serde_arc_vec::serialize")]
    pub key: Vec<Arc<SqlSelection>>,
    #[serde(serialize_with = "serde_arc_vec::serialize")]
    pub identifier: Vec<Arc<SqlSelection>>,
    #[serde(serialize_with = "serde_arc::option::serialize")]
    pub discriminator: Option<Arc<SqlSelection>>,
    pub fetches: Vec<Fetch>,
}

impl EntityFetch {
    pub fn find_fetch(&self, name: &str) -> Option<&Fetch> {
        self.fetches.iter().find(|f| f.name() == name)
    }

    fn collect_selections(&self, out: &mut Vec<Arc<SqlSelection>>) {
        out.extend(self.key.iter().cloned());
        out.extend(self.identifier.iter().cloned());
        out.extend(self.discriminator.iter().cloned());
        for fetch in &self.fetches {
            fetch.collect_selections(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionElementFetch {
    Basic(BasicFetch),
    Entity(EntityFetch),
}

/// A plural attribute read from its collection table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionFetch {
    pub path: RelationPath,
    pub timing: FetchTiming,
    pub table_alias: Option<String>,
    /// Collection key on the collection table side
    #[serde(serialize_with = "serde_arc_vec::serialize")]
    pub key: Vec<Arc<SqlSelection>>,
    #[serde(serialize_with = "serde_arc::option::serialize")]
    pub index: Option<Arc<SqlSelection>>,
    pub element: Option<CollectionElementFetch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub path: RelationPath,
    pub entity: String,
    pub table_alias: String,
    #[serde(serialize_with = "serde_arc_vec::serialize")]
    pub identifier: Vec<Arc<SqlSelection>>,
    #[serde(serialize_with = "serde_arc::option::serialize")]
    pub discriminator: Option<Arc<SqlSelection>>,
    pub fetches: Vec<Fetch>,
}

impl EntityResult {
    pub fn find_fetch(&self, name: &str) -> Option<&Fetch> {
        self.fetches.iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarResult {
    #[serde(serialize_with = "serde_arc::serialize")]
    pub selection: Arc<SqlSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DomainResult {
    Entity(EntityResult),
    Scalar(ScalarResult),
}

/// Compiled, immutable plan for one result set mapping and one result shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyPlan {
    results: Vec<DomainResult>,
    /// Distinct bound columns, ordered by result position
    #[serde(serialize_with = "serde_arc_vec::serialize")]
    selections: Vec<Arc<SqlSelection>>,
}

impl AssemblyPlan {
    pub fn new(results: Vec<DomainResult>, selections: Vec<Arc<SqlSelection>>) -> Self {
        AssemblyPlan {
            results,
            selections,
        }
    }

    pub fn results(&self) -> &[DomainResult] {
        &self.results
    }

    pub fn selections(&self) -> &[Arc<SqlSelection>] {
        &self.selections
    }

    /// Root entity result registered under `table_alias`.
    pub fn entity_result(&self, table_alias: &str) -> Option<&EntityResult> {
        self.results.iter().find_map(|r| match r {
            DomainResult::Entity(e) if e.table_alias == table_alias => Some(e),
            _ => None,
        })
    }

    /// Positions of the raw result that the plan reads.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self.selections.iter().map(|s| s.position).collect();
        positions.dedup();
        positions
    }

    pub fn explain_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
