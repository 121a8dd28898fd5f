//! YAML form of a result set mapping
//!
//! ```yaml
//! results:
//!   - entity: Employee
//!     alias: e
//!     id_columns: [emp_id]
//!     fetches:
//!       - property: name
//!         columns: [emp_name]
//!       - relation: manager
//!         alias: m
//!         columns: [mgr_id]        # omit for "no explicit columns"
//!         fetches:
//!           - property: name
//!             columns: [mgr_name]
//!   - scalar: total
//!     type: bigint
//! fetches:
//!   - owner: e
//!     relation: department
//!     alias: d
//! ```
//!
//! An omitted `columns` key on a relation and `columns: []` are different
//! declarations and are kept apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain_model::JdbcType;
use crate::mapping::entity_builder::{EntityResultBuilder, ScalarResultBuilder};
use crate::mapping::errors::MappingError;
use crate::mapping::fetch_builder::{
    FetchBuilder, LockMode, PropertyFetchBuilder, RelationFetchBuilder,
};
use crate::mapping::result_set_mapping::ResultSetMapping;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DocumentError {
    #[error("Failed to read mapping document: {error}")]
    Read { error: String },

    #[error("Failed to parse mapping document: {error}")]
    Parse { error: String },

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingDocument {
    pub results: Vec<ResultDocument>,
    #[serde(default)]
    pub fetches: Vec<LegacyFetchDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultDocument {
    Entity(EntityDocument),
    Scalar(ScalarDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDocument {
    pub entity: String,
    pub alias: String,
    #[serde(default)]
    pub id_columns: Vec<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default)]
    pub fetches: Vec<FetchDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarDocument {
    pub scalar: String,
    #[serde(rename = "type", default)]
    pub jdbc_type: Option<JdbcType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchDocument {
    Property(PropertyDocument),
    Relation(RelationDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDocument {
    pub property: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDocument {
    pub relation: String,
    pub alias: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default)]
    pub entity: Option<EntityDocument>,
    #[serde(default)]
    pub fetches: Vec<FetchDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyFetchDocument {
    pub owner: String,
    pub relation: String,
    pub alias: String,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default)]
    pub entity: Option<EntityDocument>,
    #[serde(default)]
    pub fetches: Vec<FetchDocument>,
}

impl MappingDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self, DocumentError> {
        serde_yaml::from_str(content).map_err(|e| DocumentError::Parse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DocumentError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| DocumentError::Read {
                error: format!("{}: {}", path.as_ref().display(), e),
            })?;
        Self::from_yaml_str(&content)
    }

    /// Build the declared mapping.
    pub fn to_mapping(&self) -> Result<ResultSetMapping, DocumentError> {
        let mut mapping = ResultSetMapping::new();
        for result in &self.results {
            match result {
                ResultDocument::Entity(doc) => {
                    let builder = mapping.add_entity(&doc.entity, &doc.alias)?;
                    fill_entity(builder, doc)?;
                }
                ResultDocument::Scalar(doc) => {
                    let mut scalar = ScalarResultBuilder::new(&doc.scalar);
                    if let Some(jdbc_type) = doc.jdbc_type {
                        scalar = scalar.with_type(jdbc_type);
                    }
                    mapping.add_scalar(scalar);
                }
            }
        }
        for doc in &self.fetches {
            let fetch = mapping.add_fetch(&doc.owner, &doc.alias, &doc.relation)?;
            fill_relation(
                fetch,
                doc.columns.as_deref(),
                doc.lock_mode,
                doc.entity.as_ref(),
                &doc.fetches,
            )?;
        }
        Ok(mapping)
    }
}

fn entity_builder(doc: &EntityDocument) -> Result<EntityResultBuilder, MappingError> {
    let mut builder = EntityResultBuilder::new(&doc.entity, &doc.alias);
    fill_entity(&mut builder, doc)?;
    Ok(builder)
}

fn fill_entity(builder: &mut EntityResultBuilder, doc: &EntityDocument) -> Result<(), MappingError> {
    for column in &doc.id_columns {
        builder.add_id_column(column);
    }
    if let Some(discriminator) = &doc.discriminator {
        builder.set_discriminator_column(discriminator);
    }
    builder.set_lock_mode(doc.lock_mode);
    for fetch in &doc.fetches {
        let child = fetch_builder(builder.table_alias(), fetch)?;
        builder.add_child(fetch.relation_name(), child)?;
    }
    Ok(())
}

fn fill_relation(
    builder: &mut RelationFetchBuilder,
    columns: Option<&[String]>,
    lock_mode: LockMode,
    entity: Option<&EntityDocument>,
    fetches: &[FetchDocument],
) -> Result<(), MappingError> {
    if let Some(columns) = columns {
        builder.declare_columns();
        for column in columns {
            builder.add_column(column)?;
        }
    }
    builder.set_lock_mode(lock_mode);
    if let Some(entity) = entity {
        builder.set_entity_builder(entity_builder(entity)?);
    }
    for fetch in fetches {
        let child = fetch_builder(builder.table_alias(), fetch)?;
        builder.add_child(fetch.relation_name(), child)?;
    }
    Ok(())
}

fn fetch_builder(owner_alias: &str, doc: &FetchDocument) -> Result<FetchBuilder, MappingError> {
    match doc {
        FetchDocument::Property(property) => {
            let mut builder = PropertyFetchBuilder::new(&property.property);
            for column in &property.columns {
                builder.add_column(column);
            }
            Ok(builder.into())
        }
        FetchDocument::Relation(relation) => {
            let mut builder =
                RelationFetchBuilder::new(owner_alias, &relation.alias, &relation.relation);
            fill_relation(
                &mut builder,
                relation.columns.as_deref(),
                relation.lock_mode,
                relation.entity.as_ref(),
                &relation.fetches,
            )?;
            Ok(builder.into())
        }
    }
}

impl FetchDocument {
    pub fn relation_name(&self) -> &str {
        match self {
            FetchDocument::Property(p) => &p.property,
            FetchDocument::Relation(r) => &r.relation,
        }
    }
}
