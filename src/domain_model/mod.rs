//! Domain model consumed by the mapping engine.
//!
//! The engine never discovers types on its own: it is handed an already
//! resolved model describing, per entity, its table, identifier, optional
//! discriminator and attributes. Each attribute is one of
//! - **basic**: a single column in the owner's row
//! - **embedded**: several named columns in the owner's row
//! - **to_one**: an association carrying a foreign key in the owner's table
//! - **plural**: a collection keyed by columns of its collection table
//!
//! # YAML Format
//!
//! ```yaml
//! entities:
//!   - name: Employee
//!     table: employees
//!     identifier:
//!       columns: [{ column: id, type: bigint }]
//!     attributes:
//!       - name: name
//!         kind: basic
//!         column: { column: name, type: varchar }
//!       - name: manager
//!         kind: to_one
//!         target: Employee
//!         key: [{ column: manager_id, type: bigint }]
//!       - name: reports
//!         kind: plural
//!         key: [{ column: manager_id, type: bigint }]
//!         element: { entity: Employee }
//! ```
//!
//! Selectable parts without an explicit `table` live in the owning entity's
//! table; the key, index and basic element of a plural attribute default to
//! the collection table, which itself defaults to the element entity's table.

pub mod errors;
pub mod relation_path;

pub use relation_path::RelationPath;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain_model::errors::DomainModelError;

/// Lookup seam between the engine and whatever owns the metamodel.
pub trait DomainModelLookup {
    fn find_entity(&self, name: &str) -> Option<&EntityDescriptor>;
}

/// Type the raw result value is read as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JdbcType {
    Integer,
    Bigint,
    Smallint,
    Numeric,
    Double,
    #[default]
    Varchar,
    Char,
    Boolean,
    Date,
    Timestamp,
    Uuid,
    Binary,
}

impl fmt::Display for JdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JdbcType::Integer => "integer",
            JdbcType::Bigint => "bigint",
            JdbcType::Smallint => "smallint",
            JdbcType::Numeric => "numeric",
            JdbcType::Double => "double",
            JdbcType::Varchar => "varchar",
            JdbcType::Char => "char",
            JdbcType::Boolean => "boolean",
            JdbcType::Date => "date",
            JdbcType::Timestamp => "timestamp",
            JdbcType::Uuid => "uuid",
            JdbcType::Binary => "binary",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for JdbcType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(JdbcType::Integer),
            "bigint" => Ok(JdbcType::Bigint),
            "smallint" => Ok(JdbcType::Smallint),
            "numeric" | "decimal" => Ok(JdbcType::Numeric),
            "double" => Ok(JdbcType::Double),
            "varchar" | "text" => Ok(JdbcType::Varchar),
            "char" => Ok(JdbcType::Char),
            "boolean" | "bool" => Ok(JdbcType::Boolean),
            "date" => Ok(JdbcType::Date),
            "timestamp" => Ok(JdbcType::Timestamp),
            "uuid" => Ok(JdbcType::Uuid),
            "binary" => Ok(JdbcType::Binary),
            other => Err(format!("unknown column type `{}`", other)),
        }
    }
}

/// One physical column of a mapped table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectablePart {
    /// Containing table expression; filled in from the owner when omitted
    #[serde(default)]
    pub table: String,
    pub column: String,
    #[serde(rename = "type", default)]
    pub jdbc_type: JdbcType,
}

impl SelectablePart {
    pub fn new(table: &str, column: &str, jdbc_type: JdbcType) -> Self {
        SelectablePart {
            table: table.to_string(),
            column: column.to_string(),
            jdbc_type,
        }
    }

    fn default_table(&mut self, table: &str) {
        if self.table.is_empty() {
            self.table = table.to_string();
        }
    }
}

/// Ordered key columns of an association; order is the binding order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyDescriptor {
    pub parts: Vec<SelectablePart>,
}

impl KeyDescriptor {
    pub fn new(parts: Vec<SelectablePart>) -> Self {
        KeyDescriptor { parts }
    }

    pub fn cardinality(&self) -> usize {
        self.parts.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedComponent {
    pub name: String,
    #[serde(flatten)]
    pub column: SelectablePart,
}

/// Element side of a plural attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionElement {
    /// Collection of entities, addressed by entity name
    Entity(String),
    /// Collection of single-column values
    Basic(SelectablePart),
}

/// The two addressable positions inside a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionNature {
    Element,
    Index,
}

impl CollectionNature {
    pub const ALL: [CollectionNature; 2] = [CollectionNature::Element, CollectionNature::Index];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionNature::Element => "element",
            CollectionNature::Index => "index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    Basic {
        column: SelectablePart,
    },
    Embedded {
        components: Vec<EmbeddedComponent>,
    },
    ToOne {
        target: String,
        key: KeyDescriptor,
    },
    Plural {
        /// Collection table; defaults to the element entity's table
        #[serde(default)]
        table: Option<String>,
        key: KeyDescriptor,
        element: CollectionElement,
        #[serde(default)]
        index: Option<SelectablePart>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: RelationKind,
}

impl AttributeDescriptor {
    pub fn new(name: &str, kind: RelationKind) -> Self {
        AttributeDescriptor {
            name: name.to_string(),
            kind,
        }
    }

    /// Associations get their own joined table group; basic and embedded
    /// values live in the owner's row.
    pub fn produces_join(&self) -> bool {
        matches!(
            self.kind,
            RelationKind::ToOne { .. } | RelationKind::Plural { .. }
        )
    }

    /// Foreign key of a to-one, or collection key of a plural attribute.
    pub fn key_descriptor(&self) -> Option<&KeyDescriptor> {
        match &self.kind {
            RelationKind::ToOne { key, .. } | RelationKind::Plural { key, .. } => Some(key),
            RelationKind::Basic { .. } | RelationKind::Embedded { .. } => None,
        }
    }

    pub fn is_plural(&self) -> bool {
        matches!(self.kind, RelationKind::Plural { .. })
    }

    /// Table holding the collection rows, for plural attributes.
    pub fn collection_table(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::Plural { table, .. } => table.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierDescriptor {
    #[serde(default = "default_identifier_name")]
    pub name: String,
    pub columns: Vec<SelectablePart>,
}

fn default_identifier_name() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub table: String,
    pub identifier: IdentifierDescriptor,
    #[serde(default)]
    pub discriminator: Option<SelectablePart>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
}

impl EntityDescriptor {
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Resolve `embedded.component` to the embedded attribute and its component.
    pub fn find_embedded_component(
        &self,
        path: &str,
    ) -> Option<(&AttributeDescriptor, &EmbeddedComponent)> {
        let (head, tail) = path.split_once('.')?;
        let attribute = self.find_attribute(head)?;
        match &attribute.kind {
            RelationKind::Embedded { components } => components
                .iter()
                .find(|c| c.name == tail)
                .map(|c| (attribute, c)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DomainModelConfig {
    entities: Vec<EntityDescriptor>,
}

/// Validated, table-resolved domain model.
#[derive(Debug, Clone, Default)]
pub struct DomainModel {
    entities: HashMap<String, EntityDescriptor>,
}

impl DomainModelLookup for DomainModel {
    fn find_entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }
}

impl DomainModel {
    /// Build a model from entity descriptors, filling in default tables and
    /// validating cross-entity references.
    pub fn from_entities(entities: Vec<EntityDescriptor>) -> Result<Self, DomainModelError> {
        let mut tables: HashMap<String, String> = HashMap::new();
        for entity in &entities {
            if tables
                .insert(entity.name.clone(), entity.table.clone())
                .is_some()
            {
                return Err(DomainModelError::DuplicateEntity {
                    entity: entity.name.clone(),
                });
            }
        }

        let mut resolved = HashMap::with_capacity(entities.len());
        for mut entity in entities {
            resolve_entity(&mut entity, &tables)?;
            log::debug!(
                "Registered entity '{}' on table '{}' with {} attributes",
                entity.name,
                entity.table,
                entity.attributes.len()
            );
            resolved.insert(entity.name.clone(), entity);
        }

        Ok(DomainModel { entities: resolved })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, DomainModelError> {
        let config: DomainModelConfig =
            serde_yaml::from_str(content).map_err(|e| DomainModelError::ConfigParseError {
                error: e.to_string(),
            })?;
        Self::from_entities(config.entities)
    }

    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DomainModelError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DomainModelError::ConfigReadError {
                error: format!("{}: {}", path.as_ref().display(), e),
            }
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

fn invalid(entity: &str, message: impl Into<String>) -> DomainModelError {
    DomainModelError::InvalidEntity {
        entity: entity.to_string(),
        message: message.into(),
    }
}

fn resolve_entity(
    entity: &mut EntityDescriptor,
    tables: &HashMap<String, String>,
) -> Result<(), DomainModelError> {
    let own_table = entity.table.clone();
    let entity_name = entity.name.clone();

    if entity.identifier.columns.is_empty() {
        return Err(invalid(&entity_name, "identifier has no columns"));
    }
    for part in &mut entity.identifier.columns {
        part.default_table(&own_table);
    }
    if let Some(discriminator) = &mut entity.discriminator {
        discriminator.default_table(&own_table);
    }

    let mut seen = HashSet::new();
    for attribute in &mut entity.attributes {
        if !seen.insert(attribute.name.clone()) {
            return Err(DomainModelError::DuplicateAttribute {
                entity: entity_name.clone(),
                attribute: attribute.name.clone(),
            });
        }
        let unknown_target = |target: &str| DomainModelError::UnknownTarget {
            entity: entity_name.clone(),
            attribute: attribute.name.clone(),
            target: target.to_string(),
        };

        match &mut attribute.kind {
            RelationKind::Basic { column } => column.default_table(&own_table),
            RelationKind::Embedded { components } => {
                if components.is_empty() {
                    return Err(invalid(
                        &entity_name,
                        format!("embedded attribute '{}' has no components", attribute.name),
                    ));
                }
                for component in components {
                    component.column.default_table(&own_table);
                }
            }
            RelationKind::ToOne { target, key } => {
                if !tables.contains_key(target.as_str()) {
                    return Err(unknown_target(target));
                }
                if key.parts.is_empty() {
                    return Err(invalid(
                        &entity_name,
                        format!("to-one '{}' has an empty foreign key", attribute.name),
                    ));
                }
                for part in &mut key.parts {
                    part.default_table(&own_table);
                }
            }
            RelationKind::Plural {
                table,
                key,
                element,
                index,
            } => {
                if let CollectionElement::Entity(target) = element {
                    let Some(target_table) = tables.get(target.as_str()) else {
                        return Err(unknown_target(target));
                    };
                    if table.is_none() {
                        *table = Some(target_table.clone());
                    }
                }
                let Some(collection_table) = table.clone() else {
                    return Err(invalid(
                        &entity_name,
                        format!(
                            "plural '{}' of basic values needs a collection table",
                            attribute.name
                        ),
                    ));
                };
                if key.parts.is_empty() {
                    return Err(invalid(
                        &entity_name,
                        format!("plural '{}' has an empty collection key", attribute.name),
                    ));
                }
                for part in &mut key.parts {
                    part.default_table(&collection_table);
                }
                if let CollectionElement::Basic(part) = element {
                    part.default_table(&collection_table);
                }
                if let Some(part) = index {
                    part.default_table(&collection_table);
                }
            }
        }
    }
    Ok(())
}
