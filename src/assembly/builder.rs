//! Building fetches and results from the declared builders.
//!
//! Relation builders follow a fixed protocol:
//!
//! 1. find the attribute on the parent entity and the owner group by alias
//! 2. resolve (or reuse) the join for the relation path
//! 3. when columns are declared, bind them to the association key and hand
//!    the rest to a nested entity builder if there is one, with the children
//!    of both builders in scope
//! 4. otherwise generate the standard way, with this builder's children
//!    answering lookups for its subtree

use std::sync::Arc;

use crate::assembly::alias_scope::TableGroup;
use crate::assembly::creation_state::{key_side_group, CreationState, FetchParent};
use crate::assembly::plan::{
    BasicFetch, EmbeddedComponentFetch, EmbeddedFetch, EntityResult, Fetch, ScalarResult,
};
use crate::assembly::resolver_chain::{FetchResolverChain, ResolverScope};
use crate::assembly::standard::{self, EntityMapping};
use crate::domain_model::{
    AttributeDescriptor, CollectionElement, RelationKind, RelationPath, SelectablePart,
};
use crate::mapping::entity_builder::{EntityResultBuilder, ScalarResultBuilder};
use crate::mapping::errors::{MappingError, Result};
use crate::mapping::fetch_builder::{FetchBuilder, PropertyFetchBuilder, RelationFetchBuilder};

impl FetchBuilder {
    /// Build the fetch for this mapping, to be attached to `parent`.
    pub fn build_fetch(
        &self,
        state: &mut CreationState<'_>,
        chain: FetchResolverChain<'_>,
        parent: &FetchParent<'_>,
    ) -> Result<Fetch> {
        match self {
            FetchBuilder::PropertyPath(property) => property.build_fetch(state, parent),
            FetchBuilder::Relation(relation) => relation.build_fetch(state, chain, parent),
        }
    }
}

impl PropertyFetchBuilder {
    pub fn build_fetch(
        &self,
        state: &mut CreationState<'_>,
        parent: &FetchParent<'_>,
    ) -> Result<Fetch> {
        let path = parent.path.append(self.relation_name());
        let columns = self.column_aliases();
        let group = &parent.table_group;

        if let Some((_, component)) = parent.entity.find_embedded_component(self.relation_name()) {
            let selection = state.bind_one(&path, columns, &component.column, group)?;
            return Ok(Fetch::Basic(BasicFetch { path, selection }));
        }

        let attribute = parent
            .entity
            .find_attribute(self.relation_name())
            .ok_or_else(|| MappingError::UnknownRelation {
                owner: parent.entity.name.clone(),
                relation: self.relation_name().to_string(),
            })?;

        match &attribute.kind {
            RelationKind::Basic { column } => {
                let selection = state.bind_one(&path, columns, column, group)?;
                Ok(Fetch::Basic(BasicFetch { path, selection }))
            }
            RelationKind::Embedded { components } => {
                let parts: Vec<&SelectablePart> = components.iter().map(|c| &c.column).collect();
                let bound = state.bind(&path, columns, &parts, group)?;
                let components = components
                    .iter()
                    .zip(bound)
                    .map(|(component, selection)| EmbeddedComponentFetch {
                        name: component.name.clone(),
                        selection,
                    })
                    .collect();
                Ok(Fetch::Embedded(EmbeddedFetch { path, components }))
            }
            RelationKind::ToOne { target, key } => {
                standard::delayed_to_one(state, path, target, key, columns, group)
            }
            RelationKind::Plural { .. } => Err(MappingError::unsupported(
                &path,
                "collections must be mapped with a relation builder",
            )),
        }
    }
}

impl RelationFetchBuilder {
    pub fn build_fetch(
        &self,
        state: &mut CreationState<'_>,
        chain: FetchResolverChain<'_>,
        parent: &FetchParent<'_>,
    ) -> Result<Fetch> {
        let attribute = parent
            .entity
            .find_attribute(self.relation_name())
            .ok_or_else(|| MappingError::UnknownRelation {
                owner: parent.entity.name.clone(),
                relation: self.relation_name().to_string(),
            })?;
        let owner_group = state.owner_group(self.owner_alias(), self.relation_name())?;
        let path = parent.path.append(self.relation_name());
        let group =
            state.resolve_table_group(&path, attribute, &owner_group, self.table_alias())?;

        log::debug!(
            "Building relation '{}' as '{}' from '{}' (explicit columns: {:?})",
            path,
            group.alias(),
            owner_group.alias(),
            self.column_aliases()
        );

        if let Some(columns) = self.column_aliases() {
            let key = attribute.key_descriptor().ok_or_else(|| {
                MappingError::unsupported(
                    &path,
                    format!(
                        "explicit columns declared for '{}', which has no key",
                        self.relation_name()
                    ),
                )
            })?;
            if !columns.is_empty() {
                let parts: Vec<&SelectablePart> = key.parts.iter().collect();
                let key_group = key_side_group(attribute, &owner_group, &group);
                state.bind(&path, columns, &parts, &key_group)?;
            }
            if let Some(entity) = self.entity_builder() {
                return entity.build_delegated_fetch(
                    state,
                    chain,
                    self,
                    &path,
                    attribute,
                    &owner_group,
                    &group,
                );
            }
        }

        let frame = chain.frame(ResolverScope::Relation(self), attribute.is_plural());
        let scope_entity = match &attribute.kind {
            RelationKind::ToOne { target, .. } => Some(state.entity(target)?),
            RelationKind::Plural {
                element: CollectionElement::Entity(target),
                ..
            } => Some(state.entity(target)?),
            _ => None,
        };
        if attribute.produces_join() {
            standard::validate_children(
                frame.scope(),
                scope_entity,
                attribute.is_plural(),
                &path,
            )?;
        } else {
            standard::validate_component_children(frame.scope(), attribute, &path)?;
        }
        standard::generate_relation_fetch(
            state,
            frame.chain(),
            &path,
            attribute,
            &owner_group,
            &group,
        )
    }
}

impl EntityResultBuilder {
    /// Build this builder as a root result.
    pub fn build_result(&self, state: &mut CreationState<'_>) -> Result<EntityResult> {
        let entity = state.entity(self.entity_name())?;
        let path = RelationPath::root(self.table_alias());
        let group = state
            .aliases_mut()
            .register_root(&path, self.table_alias(), &entity.table)?;

        log::debug!(
            "Building root result '{}' for entity '{}' on '{}'",
            self.table_alias(),
            entity.name,
            entity.table
        );

        let frame = FetchResolverChain::empty().frame(ResolverScope::Entity(self), false);
        standard::validate_children(frame.scope(), Some(entity), false, &path)?;

        let parent = FetchParent {
            path,
            entity,
            table_group: group,
        };
        let body = standard::entity_body(state, frame.chain(), &parent, EntityMapping::of(self))?;

        Ok(EntityResult {
            path: parent.path,
            entity: entity.name.clone(),
            table_alias: self.table_alias().to_string(),
            identifier: body.identifier,
            discriminator: body.discriminator,
            fetches: body.fetches,
        })
    }

    /// Build the association `attribute` with this builder describing its
    /// target entity. Key columns were already bound by `relation`, whose
    /// children are looked up together with this builder's own.
    pub fn build_delegated_fetch(
        &self,
        state: &mut CreationState<'_>,
        chain: FetchResolverChain<'_>,
        relation: &RelationFetchBuilder,
        path: &RelationPath,
        attribute: &AttributeDescriptor,
        owner_group: &Arc<TableGroup>,
        group: &Arc<TableGroup>,
    ) -> Result<Fetch> {
        let target = match &attribute.kind {
            RelationKind::ToOne { target, .. } => target,
            RelationKind::Plural {
                element: CollectionElement::Entity(target),
                ..
            } => target,
            _ => {
                return Err(MappingError::unsupported(
                    path,
                    "an entity builder needs an association with an entity target",
                ))
            }
        };
        if target != self.entity_name() {
            return Err(MappingError::unsupported(
                path,
                format!(
                    "entity builder for '{}' attached to an association targeting '{}'",
                    self.entity_name(),
                    target
                ),
            ));
        }
        if self.table_alias() != group.alias() {
            log::warn!(
                "Entity builder alias '{}' differs from relation alias '{}' at '{}'; using the relation alias",
                self.table_alias(),
                group.alias(),
                path
            );
        }

        if let Some((name, _)) = relation
            .children()
            .iter()
            .find(|(name, _)| self.find_child(name).is_some())
        {
            return Err(MappingError::DuplicateMapping {
                owner: path.to_string(),
                relation: name.to_string(),
            });
        }

        let entity = state.entity(target)?;
        let frame = chain.frame(
            ResolverScope::Delegated {
                relation,
                entity: self,
            },
            false,
        );
        standard::validate_children(frame.scope(), Some(entity), false, path)?;

        log::debug!("Delegating '{}' to entity builder for '{}'", path, target);

        let mapping = EntityMapping::of(self);
        if attribute.is_plural() {
            standard::collection_fetch(state, frame.chain(), path, attribute, group, mapping)
        } else {
            standard::to_one_fetch(
                state,
                frame.chain(),
                path,
                attribute,
                owner_group,
                group,
                mapping,
            )
        }
    }
}

impl ScalarResultBuilder {
    pub fn build_result(&self, state: &mut CreationState<'_>) -> Result<ScalarResult> {
        let metadata = state.metadata();
        let selection = state.selections_mut().resolve_scalar_selection(
            self.column_alias(),
            self.jdbc_type(),
            metadata,
        )?;
        Ok(ScalarResult { selection })
    }
}
