//! Fetch builders
//!
//! The user-authored half of a result set mapping. A [`FetchBuilder`] describes
//! how one relation of a parent result is read from the raw columns:
//!
//! - [`PropertyFetchBuilder`]: explicit columns for one basic or embedded
//!   attribute (or the foreign key of a to-one)
//! - [`RelationFetchBuilder`]: an association joined under its own table alias,
//!   with optional key columns, nested child builders and an optional
//!   [`EntityResultBuilder`] fully describing the target entity
//!
//! # Column List States
//!
//! A relation builder's column list has three states that compile differently:
//!
//! ```text
//! None          -> nothing declared, the relation is generated the standard way
//! Some([])      -> declared empty, no explicit key binding
//! Some([a, b])  -> bound positionally to the relation's key columns
//! ```
//!
//! Builders are mutable while the mapping is declared. Their frozen,
//! hashable form is produced by `cache_key_form` (see [`super::cache_key`]).

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::mapping::cache_key::{FetchBuilderKey, PropertyFetchKey, RelationFetchKey};
use crate::mapping::entity_builder::EntityResultBuilder;
use crate::mapping::errors::{MappingError, Result};

/// Lock mode requested for the rows read through a builder.
///
/// Carried for the executing layer only; it never changes the compiled plan
/// and is not part of a builder's cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    Read,
    Optimistic,
    PessimisticRead,
    PessimisticWrite,
    UpgradeNowait,
    UpgradeSkipLocked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchBuilder {
    PropertyPath(PropertyFetchBuilder),
    Relation(RelationFetchBuilder),
}

impl FetchBuilder {
    pub fn relation_name(&self) -> &str {
        match self {
            FetchBuilder::PropertyPath(p) => &p.relation,
            FetchBuilder::Relation(r) => &r.relation,
        }
    }

    pub fn cache_key_form(&self) -> FetchBuilderKey {
        match self {
            FetchBuilder::PropertyPath(p) => FetchBuilderKey::PropertyPath(p.cache_key_form()),
            FetchBuilder::Relation(r) => FetchBuilderKey::Relation(r.cache_key_form()),
        }
    }
}

impl From<PropertyFetchBuilder> for FetchBuilder {
    fn from(builder: PropertyFetchBuilder) -> Self {
        FetchBuilder::PropertyPath(builder)
    }
}

impl From<RelationFetchBuilder> for FetchBuilder {
    fn from(builder: RelationFetchBuilder) -> Self {
        FetchBuilder::Relation(builder)
    }
}

/// Explicit columns for a single attribute, resolved against the parent's
/// table group. An empty column list falls back to the attribute's default
/// column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFetchBuilder {
    relation: String,
    columns: Vec<String>,
}

impl PropertyFetchBuilder {
    pub fn new(relation: &str) -> Self {
        PropertyFetchBuilder {
            relation: relation.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn with_columns(relation: &str, columns: &[&str]) -> Self {
        PropertyFetchBuilder {
            relation: relation.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn add_column(&mut self, alias: &str) -> &mut Self {
        self.columns.push(alias.to_string());
        self
    }

    pub fn relation_name(&self) -> &str {
        &self.relation
    }

    pub fn column_aliases(&self) -> &[String] {
        &self.columns
    }

    pub fn cache_key_form(&self) -> PropertyFetchKey {
        PropertyFetchKey {
            relation: self.relation.clone(),
            columns: self.columns.clone(),
        }
    }
}

/// Child builders keyed by relation name, shared by relation and entity builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBuilderMap {
    builders: HashMap<String, FetchBuilder>,
}

impl FetchBuilderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn get(&self, relation: &str) -> Option<&FetchBuilder> {
        self.builders.get(relation)
    }

    pub(crate) fn insert_new(
        &mut self,
        owner: &str,
        relation: &str,
        builder: FetchBuilder,
    ) -> Result<&mut FetchBuilder> {
        match self.builders.entry(relation.to_string()) {
            Entry::Occupied(_) => Err(MappingError::DuplicateMapping {
                owner: owner.to_string(),
                relation: relation.to_string(),
            }),
            Entry::Vacant(slot) => Ok(slot.insert(builder)),
        }
    }

    pub(crate) fn insert_property(
        &mut self,
        owner: &str,
        relation: &str,
    ) -> Result<&mut PropertyFetchBuilder> {
        let builder = PropertyFetchBuilder::new(relation).into();
        match self.insert_new(owner, relation, builder)? {
            FetchBuilder::PropertyPath(property) => Ok(property),
            FetchBuilder::Relation(_) => unreachable!("just inserted a property builder"),
        }
    }

    pub(crate) fn insert_relation(
        &mut self,
        owner: &str,
        relation: &str,
        table_alias: &str,
    ) -> Result<&mut RelationFetchBuilder> {
        let builder = RelationFetchBuilder::new(owner, table_alias, relation).into();
        match self.insert_new(owner, relation, builder)? {
            FetchBuilder::Relation(child) => Ok(child),
            FetchBuilder::PropertyPath(_) => unreachable!("just inserted a relation builder"),
        }
    }

    pub fn replace(&mut self, relation: &str, builder: FetchBuilder) -> Option<FetchBuilder> {
        self.builders.insert(relation.to_string(), builder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FetchBuilder)> {
        self.builders.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut FetchBuilder> {
        self.builders.values_mut()
    }

    pub fn cache_key_form(&self) -> BTreeMap<String, FetchBuilderKey> {
        self.builders
            .iter()
            .map(|(name, builder)| (name.clone(), builder.cache_key_form()))
            .collect()
    }
}

/// Association fetched under its own table alias.
#[derive(Debug, Clone)]
pub struct RelationFetchBuilder {
    owner_alias: String,
    table_alias: String,
    relation: String,
    columns: Option<Vec<String>>,
    children: FetchBuilderMap,
    entity: Option<EntityResultBuilder>,
    lock_mode: LockMode,
}

impl RelationFetchBuilder {
    /// Builder without explicit columns.
    pub fn new(owner_alias: &str, table_alias: &str, relation: &str) -> Self {
        RelationFetchBuilder {
            owner_alias: owner_alias.to_string(),
            table_alias: table_alias.to_string(),
            relation: relation.to_string(),
            columns: None,
            children: FetchBuilderMap::new(),
            entity: None,
            lock_mode: LockMode::None,
        }
    }

    /// Builder with an explicit (possibly empty) column list.
    pub fn with_columns(
        owner_alias: &str,
        table_alias: &str,
        relation: &str,
        columns: &[&str],
    ) -> Self {
        let mut builder = Self::new(owner_alias, table_alias, relation);
        builder.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        builder
    }

    pub fn owner_alias(&self) -> &str {
        &self.owner_alias
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    pub fn relation_name(&self) -> &str {
        &self.relation
    }

    /// `None` when no explicit column list was declared.
    pub fn column_aliases(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Switch to explicit-column mode, keeping any columns already declared.
    pub fn declare_columns(&mut self) -> &mut Self {
        self.columns.get_or_insert_with(Vec::new);
        self
    }

    pub fn add_column(&mut self, alias: &str) -> Result<&mut Self> {
        let Some(columns) = self.columns.as_mut() else {
            return Err(MappingError::InvalidMappingState {
                relation: self.relation.clone(),
                column: alias.to_string(),
            });
        };
        columns.push(alias.to_string());
        Ok(self)
    }

    pub fn entity_builder(&self) -> Option<&EntityResultBuilder> {
        self.entity.as_ref()
    }

    /// Attach a builder fully describing the target entity. Compilation
    /// delegates to it once the key columns are bound.
    pub fn set_entity_builder(&mut self, entity: EntityResultBuilder) -> &mut Self {
        self.entity = Some(entity);
        self
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    pub fn set_lock_mode(&mut self, lock_mode: LockMode) -> &mut Self {
        self.lock_mode = lock_mode;
        self
    }

    pub fn add_property(&mut self, relation: &str) -> Result<&mut PropertyFetchBuilder> {
        self.children.insert_property(&self.table_alias, relation)
    }

    /// Map `relation` to explicit columns in one call.
    pub fn add_property_columns(&mut self, relation: &str, columns: &[&str]) -> Result<&mut Self> {
        let property = self.add_property(relation)?;
        for column in columns {
            property.add_column(column);
        }
        Ok(self)
    }

    /// Add a nested association joined under `table_alias`, owned by this
    /// builder's alias.
    pub fn add_relation(
        &mut self,
        relation: &str,
        table_alias: &str,
    ) -> Result<&mut RelationFetchBuilder> {
        self.children
            .insert_relation(&self.table_alias, relation, table_alias)
    }

    /// Register a builder assembled elsewhere.
    pub fn add_child(&mut self, relation: &str, builder: FetchBuilder) -> Result<()> {
        self.children
            .insert_new(&self.table_alias, relation, builder)
            .map(|_| ())
    }

    /// Register a builder, replacing any existing mapping for `relation`.
    pub fn replace_child(&mut self, relation: &str, builder: FetchBuilder) -> Option<FetchBuilder> {
        self.children.replace(relation, builder)
    }

    pub fn find_child(&self, relation: &str) -> Option<&FetchBuilder> {
        self.children.get(relation)
    }

    /// Visit every child mapping. Iteration order is unspecified.
    pub fn visit_children<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &FetchBuilder),
    {
        for (name, child) in self.children.iter() {
            visitor(name, child);
        }
    }

    pub fn children(&self) -> &FetchBuilderMap {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut FetchBuilderMap {
        &mut self.children
    }

    pub(crate) fn entity_builder_mut(&mut self) -> Option<&mut EntityResultBuilder> {
        self.entity.as_mut()
    }

    pub fn cache_key_form(&self) -> RelationFetchKey {
        RelationFetchKey {
            owner_alias: self.owner_alias.clone(),
            table_alias: self.table_alias.clone(),
            relation: self.relation.clone(),
            columns: self.columns.clone(),
            children: self.children.cache_key_form(),
            entity: self.entity.as_ref().map(EntityResultBuilder::cache_key_form),
        }
    }
}

// Lock mode is runtime-only state and does not take part in equality.
impl PartialEq for RelationFetchBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.owner_alias == other.owner_alias
            && self.table_alias == other.table_alias
            && self.relation == other.relation
            && self.columns == other.columns
            && self.children == other.children
            && self.entity == other.entity
    }
}
