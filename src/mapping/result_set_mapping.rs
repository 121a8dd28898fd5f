//! Result set mapping
//!
//! Top-level description of one raw result: root results in the order they
//! appear in each produced row, plus *legacy fetches*. A legacy fetch is a
//! relation declared at top level against an owner alias instead of nested
//! under its owner; compilation first attaches every legacy fetch to the
//! builder registered under its owner alias, then compiles the attached tree.

use std::collections::BTreeMap;

use crate::assembly;
use crate::assembly::plan::AssemblyPlan;
use crate::domain_model::DomainModelLookup;
use crate::mapping::cache_key::{ResultBuilderKey, ResultSetMappingKey};
use crate::mapping::entity_builder::{EntityResultBuilder, ScalarResultBuilder};
use crate::mapping::errors::{MappingError, Result};
use crate::mapping::fetch_builder::{FetchBuilder, FetchBuilderMap, RelationFetchBuilder};
use crate::result_metadata::ResultSetMetadata;

#[derive(Debug, Clone, PartialEq)]
pub enum ResultBuilder {
    Entity(EntityResultBuilder),
    Scalar(ScalarResultBuilder),
}

impl ResultBuilder {
    pub fn cache_key_form(&self) -> ResultBuilderKey {
        match self {
            ResultBuilder::Entity(e) => ResultBuilderKey::Entity(e.cache_key_form()),
            ResultBuilder::Scalar(s) => ResultBuilderKey::Scalar(s.cache_key_form()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSetMapping {
    results: Vec<ResultBuilder>,
    legacy_fetches: Vec<RelationFetchBuilder>,
}

impl ResultSetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[ResultBuilder] {
        &self.results
    }

    pub fn legacy_fetches(&self) -> &[RelationFetchBuilder] {
        &self.legacy_fetches
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn check_alias_free(&self, alias: &str) -> Result<()> {
        let entity_alias = self.results.iter().find_map(|r| match r {
            ResultBuilder::Entity(e) if e.table_alias() == alias => Some(e.entity_name()),
            _ => None,
        });
        if let Some(entity) = entity_alias {
            return Err(MappingError::DuplicateAlias {
                alias: alias.to_string(),
                existing: entity.to_string(),
            });
        }
        if let Some(fetch) = self
            .legacy_fetches
            .iter()
            .find(|f| f.table_alias() == alias)
        {
            return Err(MappingError::DuplicateAlias {
                alias: alias.to_string(),
                existing: format!("{}.{}", fetch.owner_alias(), fetch.relation_name()),
            });
        }
        Ok(())
    }

    /// Add a root entity result read under `table_alias`.
    pub fn add_entity(
        &mut self,
        entity: &str,
        table_alias: &str,
    ) -> Result<&mut EntityResultBuilder> {
        self.check_alias_free(table_alias)?;
        self.results
            .push(ResultBuilder::Entity(EntityResultBuilder::new(entity, table_alias)));
        match self.results.last_mut() {
            Some(ResultBuilder::Entity(builder)) => Ok(builder),
            _ => unreachable!("just pushed an entity result"),
        }
    }

    pub fn add_scalar(&mut self, scalar: ScalarResultBuilder) -> &mut Self {
        self.results.push(ResultBuilder::Scalar(scalar));
        self
    }

    /// Declare a relation of the builder registered under `owner_alias`,
    /// joined under `table_alias`.
    pub fn add_fetch(
        &mut self,
        owner_alias: &str,
        table_alias: &str,
        relation: &str,
    ) -> Result<&mut RelationFetchBuilder> {
        self.check_alias_free(table_alias)?;
        self.legacy_fetches
            .push(RelationFetchBuilder::new(owner_alias, table_alias, relation));
        match self.legacy_fetches.last_mut() {
            Some(fetch) => Ok(fetch),
            None => unreachable!("just pushed a legacy fetch"),
        }
    }

    /// Legacy fetches that attach to an owner are folded into it, so the key
    /// equals that of the same tree declared nested. Unattached ones are kept
    /// by alias.
    pub fn cache_key_form(&self) -> ResultSetMappingKey {
        if let Ok(results) = self.resolve_legacy_fetches() {
            return ResultSetMappingKey {
                results: results.iter().map(ResultBuilder::cache_key_form).collect(),
                legacy_fetches: BTreeMap::new(),
            };
        }
        ResultSetMappingKey {
            results: self.results.iter().map(ResultBuilder::cache_key_form).collect(),
            legacy_fetches: self
                .legacy_fetches
                .iter()
                .map(|f| (f.table_alias().to_string(), f.cache_key_form()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    /// Root results with every legacy fetch attached under its owner.
    pub fn resolve_legacy_fetches(&self) -> Result<Vec<ResultBuilder>> {
        let mut results = self.results.clone();
        let mut pending = self.legacy_fetches.clone();

        for result in results.iter_mut() {
            if pending.is_empty() {
                break;
            }
            if let ResultBuilder::Entity(entity) = result {
                attach_to_entity(entity, &mut pending)?;
            }
        }

        if let Some(orphan) = pending.first() {
            return Err(MappingError::UnknownOwnerAlias {
                alias: orphan.owner_alias().to_string(),
                relation: orphan.relation_name().to_string(),
            });
        }
        Ok(results)
    }

    /// Compile this mapping against `model` for a result shaped like `metadata`.
    pub fn compile(
        &self,
        model: &dyn DomainModelLookup,
        metadata: &ResultSetMetadata,
    ) -> Result<AssemblyPlan> {
        let results = self.resolve_legacy_fetches()?;
        assembly::compile(&results, model, metadata)
    }
}

fn take_owned_by(pending: &mut Vec<RelationFetchBuilder>, alias: &str) -> Vec<RelationFetchBuilder> {
    let (owned, rest): (Vec<_>, Vec<_>) =
        pending.drain(..).partition(|f| f.owner_alias() == alias);
    *pending = rest;
    owned
}

fn attach_to_entity(
    entity: &mut EntityResultBuilder,
    pending: &mut Vec<RelationFetchBuilder>,
) -> Result<()> {
    for fetch in take_owned_by(pending, entity.table_alias()) {
        let relation = fetch.relation_name().to_string();
        entity.add_child(&relation, fetch.into())?;
    }
    attach_to_children(entity.children_mut(), pending)
}

fn attach_to_relation(
    relation: &mut RelationFetchBuilder,
    pending: &mut Vec<RelationFetchBuilder>,
) -> Result<()> {
    for fetch in take_owned_by(pending, relation.table_alias()) {
        let name = fetch.relation_name().to_string();
        relation.add_child(&name, fetch.into())?;
    }
    attach_to_children(relation.children_mut(), pending)?;
    if let Some(entity) = relation.entity_builder_mut() {
        attach_to_entity(entity, pending)?;
    }
    Ok(())
}

fn attach_to_children(
    children: &mut FetchBuilderMap,
    pending: &mut Vec<RelationFetchBuilder>,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    for child in children.values_mut() {
        if let FetchBuilder::Relation(relation) = child {
            attach_to_relation(relation, pending)?;
        }
    }
    Ok(())
}
