//! Alias scope and join resolution
//!
//! A [`TableGroup`] is the handle for one aliased source in the raw query: a
//! root entity's table, or the table(s) joined in for an association. The
//! [`AliasScope`] registers groups by relation path and by table alias for one
//! compilation.
//!
//! Join decision:
//!
//! ```text
//! to_one / plural   -> join under the declared alias, registered by path
//! basic / embedded  -> owner's group, nothing registered
//! ```
//!
//! Resolution is idempotent: a path that already has a group gets the same
//! `Arc` back, so no join is ever synthesized twice.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain_model::{AttributeDescriptor, RelationPath};
use crate::mapping::errors::{MappingError, Result};

#[derive(Debug, PartialEq, Eq)]
pub struct TableGroup {
    path: RelationPath,
    alias: String,
    tables: Vec<String>,
    owner: Option<Arc<TableGroup>>,
}

impl TableGroup {
    pub fn path(&self) -> &RelationPath {
        &self.path
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Group this one was joined from; `None` for roots.
    pub fn owner(&self) -> Option<&Arc<TableGroup>> {
        self.owner.as_ref()
    }

    pub fn is_joined(&self) -> bool {
        self.owner.is_some()
    }

    /// Alias qualifying `table` as seen from this group: its own alias when
    /// the group contains the table, otherwise the nearest owner's.
    pub fn resolve_table_reference(&self, table: &str) -> Option<&str> {
        let mut group = self;
        loop {
            if group.tables.iter().any(|t| t == table) {
                return Some(&group.alias);
            }
            group = group.owner.as_deref()?;
        }
    }
}

#[derive(Debug, Default)]
pub struct AliasScope {
    by_path: HashMap<RelationPath, Arc<TableGroup>>,
    by_alias: HashMap<String, Arc<TableGroup>>,
}

impl AliasScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn find_by_alias(&self, alias: &str) -> Option<Arc<TableGroup>> {
        self.by_alias.get(alias).cloned()
    }

    pub fn find_by_path(&self, path: &RelationPath) -> Option<Arc<TableGroup>> {
        self.by_path.get(path).cloned()
    }

    /// Register the group of a root result. Each alias names at most one root.
    pub fn register_root(
        &mut self,
        path: &RelationPath,
        alias: &str,
        table: &str,
    ) -> Result<Arc<TableGroup>> {
        let group = Arc::new(TableGroup {
            path: path.clone(),
            alias: alias.to_string(),
            tables: vec![table.to_string()],
            owner: None,
        });
        self.register(group)
    }

    /// Resolve the group `attribute` is read from.
    ///
    /// `joined_tables` is only consulted when a new join has to be created.
    pub fn resolve_table_group<F>(
        &mut self,
        path: &RelationPath,
        attribute: &AttributeDescriptor,
        owner: &Arc<TableGroup>,
        alias: &str,
        joined_tables: F,
    ) -> Result<Arc<TableGroup>>
    where
        F: FnOnce() -> Result<Vec<String>>,
    {
        if !attribute.produces_join() {
            return Ok(owner.clone());
        }
        if let Some(existing) = self.by_path.get(path) {
            return Ok(existing.clone());
        }

        let group = Arc::new(TableGroup {
            path: path.clone(),
            alias: alias.to_string(),
            tables: joined_tables()?,
            owner: Some(owner.clone()),
        });
        log::debug!(
            "Joined '{}' as '{}' from '{}' over {:?}",
            path,
            alias,
            owner.alias(),
            group.tables
        );
        self.register(group)
    }

    fn register(&mut self, group: Arc<TableGroup>) -> Result<Arc<TableGroup>> {
        if let Some(existing) = self.by_alias.get(group.alias()) {
            return Err(MappingError::DuplicateAlias {
                alias: group.alias().to_string(),
                existing: existing.path().to_string(),
            });
        }
        self.by_alias
            .insert(group.alias().to_string(), group.clone());
        self.by_path.insert(group.path().clone(), group.clone());
        Ok(group)
    }
}
