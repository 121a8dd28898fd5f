//! Root result builders: entities and scalars.

use crate::domain_model::JdbcType;
use crate::mapping::cache_key::{EntityResultKey, ScalarResultKey};
use crate::mapping::errors::Result;
use crate::mapping::fetch_builder::{
    FetchBuilder, FetchBuilderMap, LockMode, PropertyFetchBuilder, RelationFetchBuilder,
};

/// Describes an entity read from the result set under `table_alias`.
///
/// Used as a root result of a mapping, and nested under a
/// [`RelationFetchBuilder`] when the association's target entity is mapped
/// explicitly. Identifier and discriminator columns fall back to the entity's
/// default column names when none are given.
#[derive(Debug, Clone)]
pub struct EntityResultBuilder {
    entity: String,
    table_alias: String,
    id_columns: Vec<String>,
    discriminator_column: Option<String>,
    children: FetchBuilderMap,
    lock_mode: LockMode,
}

impl EntityResultBuilder {
    pub fn new(entity: &str, table_alias: &str) -> Self {
        EntityResultBuilder {
            entity: entity.to_string(),
            table_alias: table_alias.to_string(),
            id_columns: Vec::new(),
            discriminator_column: None,
            children: FetchBuilderMap::new(),
            lock_mode: LockMode::None,
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    pub fn add_id_column(&mut self, alias: &str) -> &mut Self {
        self.id_columns.push(alias.to_string());
        self
    }

    pub fn id_column_aliases(&self) -> &[String] {
        &self.id_columns
    }

    pub fn set_discriminator_column(&mut self, alias: &str) -> &mut Self {
        self.discriminator_column = Some(alias.to_string());
        self
    }

    pub fn discriminator_column(&self) -> Option<&str> {
        self.discriminator_column.as_deref()
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

    pub fn add_property_columns(&mut self, relation: &str, columns: &[&str]) -> Result<&mut Self> {
        let property = self.add_property(relation)?;
        for column in columns {
            property.add_column(column);
        }
        Ok(self)
    }

    pub fn add_relation(
        &mut self,
        relation: &str,
        table_alias: &str,
    ) -> Result<&mut RelationFetchBuilder> {
        self.children
            .insert_relation(&self.table_alias, relation, table_alias)
    }

    pub fn add_child(&mut self, relation: &str, builder: FetchBuilder) -> Result<()> {
        self.children
            .insert_new(&self.table_alias, relation, builder)
            .map(|_| ())
    }

    pub fn replace_child(&mut self, relation: &str, builder: FetchBuilder) -> Option<FetchBuilder> {
        self.children.replace(relation, builder)
    }

    pub fn find_child(&self, relation: &str) -> Option<&FetchBuilder> {
        self.children.get(relation)
    }

    pub fn children(&self) -> &FetchBuilderMap {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut FetchBuilderMap {
        &mut self.children
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

    pub fn cache_key_form(&self) -> EntityResultKey {
        EntityResultKey {
            entity: self.entity.clone(),
            table_alias: self.table_alias.clone(),
            id_columns: self.id_columns.clone(),
            discriminator_column: self.discriminator_column.clone(),
            children: self.children.cache_key_form(),
        }
    }
}

impl PartialEq for EntityResultBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.table_alias == other.table_alias
            && self.id_columns == other.id_columns
            && self.discriminator_column == other.discriminator_column
            && self.children == other.children
    }
}

/// A single raw column returned as a scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarResultBuilder {
    column_alias: String,
    jdbc_type: Option<JdbcType>,
}

impl ScalarResultBuilder {
    pub fn new(column_alias: &str) -> Self {
        ScalarResultBuilder {
            column_alias: column_alias.to_string(),
            jdbc_type: None,
        }
    }

    /// Read the column as `jdbc_type` instead of the type reported by the result.
    pub fn with_type(mut self, jdbc_type: JdbcType) -> Self {
        self.jdbc_type = Some(jdbc_type);
        self
    }

    pub fn column_alias(&self) -> &str {
        &self.column_alias
    }

    pub fn jdbc_type(&self) -> Option<JdbcType> {
        self.jdbc_type
    }

    pub fn cache_key_form(&self) -> ScalarResultKey {
        ScalarResultKey {
            column_alias: self.column_alias.clone(),
            jdbc_type: self.jdbc_type,
        }
    }
}
