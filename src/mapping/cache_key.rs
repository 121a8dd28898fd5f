//! Cache keys for compiled plans
//!
//! The frozen counterpart of the builder tree. A key is a deep copy holding
//! only structural content, so two mappings authored independently but
//! describing the same shape compare and hash equal:
//!
//! ```text
//! RelationFetchKey
//! ├── owner_alias, table_alias, relation
//! ├── columns: None | Some([..])        (order-sensitive, None != Some([]))
//! ├── children: BTreeMap<name, FetchBuilderKey>
//! └── entity:   Option<EntityResultKey>
//! ```
//!
//! Children are kept in a sorted map so hashing does not depend on the
//! declaration order. Lock modes are runtime state and never appear here.

use std::collections::BTreeMap;

use crate::domain_model::JdbcType;

/// Produce the normalized cache-key form of a value.
///
/// Keys normalize to themselves, so normalizing twice is a no-op.
pub trait CacheKeyForm {
    type Key: Clone + Eq + std::hash::Hash;

    fn cache_key_form(&self) -> Self::Key;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchBuilderKey {
    PropertyPath(PropertyFetchKey),
    Relation(RelationFetchKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyFetchKey {
    pub relation: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationFetchKey {
    pub owner_alias: String,
    pub table_alias: String,
    pub relation: String,
    pub columns: Option<Vec<String>>,
    pub children: BTreeMap<String, FetchBuilderKey>,
    pub entity: Option<EntityResultKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityResultKey {
    pub entity: String,
    pub table_alias: String,
    pub id_columns: Vec<String>,
    pub discriminator_column: Option<String>,
    pub children: BTreeMap<String, FetchBuilderKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScalarResultKey {
    pub column_alias: String,
    pub jdbc_type: Option<JdbcType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResultBuilderKey {
    Entity(EntityResultKey),
    Scalar(ScalarResultKey),
}

/// Key of a whole result set mapping. Results keep their declaration order
/// (it is the order of the produced row tuple); legacy fetches are keyed by
/// their table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultSetMappingKey {
    pub results: Vec<ResultBuilderKey>,
    pub legacy_fetches: BTreeMap<String, RelationFetchKey>,
}

macro_rules! identity_cache_key {
    ($($key:ty),* $(,)?) => {
        $(
            impl CacheKeyForm for $key {
                type Key = $key;

                fn cache_key_form(&self) -> Self::Key {
                    self.clone()
                }
            }
        )*
    };
}

identity_cache_key!(
    FetchBuilderKey,
    PropertyFetchKey,
    RelationFetchKey,
    EntityResultKey,
    ScalarResultKey,
    ResultBuilderKey,
    ResultSetMappingKey,
);

impl CacheKeyForm for crate::mapping::fetch_builder::FetchBuilder {
    type Key = FetchBuilderKey;

    fn cache_key_form(&self) -> Self::Key {
        crate::mapping::fetch_builder::FetchBuilder::cache_key_form(self)
    }
}

impl CacheKeyForm for crate::mapping::fetch_builder::RelationFetchBuilder {
    type Key = RelationFetchKey;

    fn cache_key_form(&self) -> Self::Key {
        crate::mapping::fetch_builder::RelationFetchBuilder::cache_key_form(self)
    }
}

impl CacheKeyForm for crate::mapping::entity_builder::EntityResultBuilder {
    type Key = EntityResultKey;

    fn cache_key_form(&self) -> Self::Key {
        crate::mapping::entity_builder::EntityResultBuilder::cache_key_form(self)
    }
}
