//! Per-compilation state shared by every build call.

use std::sync::Arc;

use crate::assembly::alias_scope::{AliasScope, TableGroup};
use crate::assembly::selection::{SelectionRegistry, SqlSelection};
use crate::domain_model::{
    AttributeDescriptor, CollectionElement, DomainModelLookup, EntityDescriptor, RelationKind,
    RelationPath, SelectablePart,
};
use crate::mapping::errors::{MappingError, Result};
use crate::result_metadata::ResultSetMetadata;

pub struct CreationState<'m> {
    model: &'m dyn DomainModelLookup,
    metadata: &'m ResultSetMetadata,
    aliases: AliasScope,
    selections: SelectionRegistry,
}

impl<'m> CreationState<'m> {
    pub fn new(model: &'m dyn DomainModelLookup, metadata: &'m ResultSetMetadata) -> Self {
        CreationState {
            model,
            metadata,
            aliases: AliasScope::new(),
            selections: SelectionRegistry::new(),
        }
    }

    pub fn entity(&self, name: &str) -> Result<&'m EntityDescriptor> {
        self.model
            .find_entity(name)
            .ok_or_else(|| MappingError::UnknownEntity {
                entity: name.to_string(),
            })
    }

    pub fn aliases(&self) -> &AliasScope {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasScope {
        &mut self.aliases
    }

    pub fn selections(&self) -> &SelectionRegistry {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut SelectionRegistry {
        &mut self.selections
    }

    pub fn metadata(&self) -> &'m ResultSetMetadata {
        self.metadata
    }

    /// Owner group registered under `alias`, for a relation declared as
    /// `relation`.
    pub fn owner_group(&self, alias: &str, relation: &str) -> Result<Arc<TableGroup>> {
        self.aliases
            .find_by_alias(alias)
            .ok_or_else(|| MappingError::UnknownOwnerAlias {
                alias: alias.to_string(),
                relation: relation.to_string(),
            })
    }

    /// Join (or reuse) the group for `attribute` at `path`.
    pub fn resolve_table_group(
        &mut self,
        path: &RelationPath,
        attribute: &AttributeDescriptor,
        owner: &Arc<TableGroup>,
        alias: &str,
    ) -> Result<Arc<TableGroup>> {
        let model = self.model;
        self.aliases
            .resolve_table_group(path, attribute, owner, alias, || {
                joined_tables(model, path, attribute)
            })
    }

    /// Bind `parts` in `group`, positionally against `columns` when given.
    pub fn bind(
        &mut self,
        path: &RelationPath,
        columns: &[String],
        parts: &[&SelectablePart],
        group: &TableGroup,
    ) -> Result<Vec<Arc<SqlSelection>>> {
        self.selections
            .bind_columns(path, columns, parts, group, self.metadata)
    }

    /// Bind a single part; `columns` may hold at most one alias.
    pub fn bind_one(
        &mut self,
        path: &RelationPath,
        columns: &[String],
        part: &SelectablePart,
        group: &TableGroup,
    ) -> Result<Arc<SqlSelection>> {
        let mut bound = self.bind(path, columns, &[part], group)?;
        bound
            .pop()
            .ok_or_else(|| MappingError::unresolvable(path, "no selection was bound"))
    }

    pub fn into_selections(self) -> SelectionRegistry {
        self.selections
    }
}

/// Parent of the fetches being generated: its position, its entity and the
/// group its columns are read from.
#[derive(Debug, Clone)]
pub struct FetchParent<'m> {
    pub path: RelationPath,
    pub entity: &'m EntityDescriptor,
    pub table_group: Arc<TableGroup>,
}

/// Group the key of an association is read from: a to-one's foreign key lives
/// in the owner row, a collection key in the collection table.
pub fn key_side_group(
    attribute: &AttributeDescriptor,
    owner: &Arc<TableGroup>,
    joined: &Arc<TableGroup>,
) -> Arc<TableGroup> {
    match attribute.kind {
        RelationKind::Plural { .. } => joined.clone(),
        _ => owner.clone(),
    }
}

fn joined_tables(
    model: &dyn DomainModelLookup,
    path: &RelationPath,
    attribute: &AttributeDescriptor,
) -> Result<Vec<String>> {
    let entity_table = |name: &str| {
        model
            .find_entity(name)
            .map(|e| e.table.clone())
            .ok_or_else(|| MappingError::UnknownEntity {
                entity: name.to_string(),
            })
    };

    match &attribute.kind {
        RelationKind::ToOne { target, .. } => Ok(vec![entity_table(target)?]),
        RelationKind::Plural { element, .. } => {
            let collection_table = attribute
                .collection_table()
                .map(str::to_string)
                .ok_or_else(|| {
                    MappingError::unsupported(path, "plural attribute without a collection table")
                })?;
            let mut tables = vec![collection_table];
            if let CollectionElement::Entity(target) = element {
                let element_table = entity_table(target)?;
                if !tables.contains(&element_table) {
                    tables.push(element_table);
                }
            }
            Ok(tables)
        }
        RelationKind::Basic { .. } | RelationKind::Embedded { .. } => Ok(Vec::new()),
    }
}
