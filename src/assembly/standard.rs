//! Standard fetch generation
//!
//! Builds fetches straight from the domain model, consulting the innermost
//! resolver scope for explicit overrides. Defaults:
//!
//! ```text
//! basic / embedded    bound by the model's column names in the parent group
//! to_one (nested)     delayed, carries only its foreign key
//! plural (nested)     delayed, no selections
//! ```
//!
//! Associations reached through a relation builder (or an entity delegate)
//! are generated immediately: key, target identifier, discriminator and every
//! target attribute.

use std::sync::Arc;

use crate::assembly::alias_scope::TableGroup;
use crate::assembly::creation_state::{CreationState, FetchParent};
use crate::assembly::plan::{
    BasicFetch, CollectionElementFetch, CollectionFetch, EmbeddedComponentFetch, EmbeddedFetch,
    EntityFetch, Fetch, FetchTiming,
};
use crate::assembly::resolver_chain::{FetchResolverChain, ResolverScope};
use crate::assembly::selection::SqlSelection;
use crate::domain_model::{
    AttributeDescriptor, CollectionElement, CollectionNature, EmbeddedComponent,
    EntityDescriptor, KeyDescriptor, RelationKind, RelationPath, SelectablePart,
};
use crate::mapping::entity_builder::EntityResultBuilder;
use crate::mapping::errors::{MappingError, Result};
use crate::mapping::fetch_builder::FetchBuilder;

/// Explicit entity-level columns and the nature prefix used for lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityMapping<'b> {
    pub nature: Option<CollectionNature>,
    pub id_columns: &'b [String],
    pub discriminator_column: Option<&'b str>,
}

impl<'b> EntityMapping<'b> {
    pub fn standard(nature: Option<CollectionNature>) -> Self {
        EntityMapping {
            nature,
            ..Default::default()
        }
    }

    pub fn of(builder: &'b EntityResultBuilder) -> Self {
        EntityMapping {
            nature: None,
            id_columns: builder.id_column_aliases(),
            discriminator_column: builder.discriminator_column(),
        }
    }
}

pub struct EntityBody {
    pub identifier: Vec<Arc<SqlSelection>>,
    pub discriminator: Option<Arc<SqlSelection>>,
    pub fetches: Vec<Fetch>,
}

fn relative_path(nature: Option<CollectionNature>, name: &str) -> String {
    match nature {
        Some(nature) => format!("{}.{}", nature.as_str(), name),
        None => name.to_string(),
    }
}

fn key_parts(key: &KeyDescriptor) -> Vec<&SelectablePart> {
    key.parts.iter().collect()
}

/// Columns of an explicit property mapping for `relative`, if any.
pub fn explicit_columns<'a>(
    chain: FetchResolverChain<'a>,
    relative: &str,
    path: &RelationPath,
) -> Result<Option<&'a [String]>> {
    match chain.resolve(relative) {
        None => Ok(None),
        Some(FetchBuilder::PropertyPath(property)) => Ok(Some(property.column_aliases())),
        Some(FetchBuilder::Relation(_)) => Err(MappingError::unsupported(
            path,
            format!("'{}' is mapped as a relation where columns are expected", relative),
        )),
    }
}

/// Reject children of `scope` that name nothing on `entity`.
///
/// Collection scopes also accept the `index` and `element` positions.
pub fn validate_children(
    scope: ResolverScope<'_>,
    entity: Option<&EntityDescriptor>,
    collection: bool,
    path: &RelationPath,
) -> Result<()> {
    for name in scope.child_names() {
        if collection && CollectionNature::ALL.iter().any(|n| n.as_str() == name) {
            continue;
        }
        let known = entity.is_some_and(|e| {
            e.identifier.name == name
                || e.find_attribute(name).is_some()
                || e.find_embedded_component(name).is_some()
        });
        if !known {
            return Err(MappingError::UnknownRelation {
                owner: entity
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| path.to_string()),
                relation: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Reject children of a value attribute's scope that name none of its
/// embedded components. A basic attribute accepts no children.
pub fn validate_component_children(
    scope: ResolverScope<'_>,
    attribute: &AttributeDescriptor,
    path: &RelationPath,
) -> Result<()> {
    let components: &[EmbeddedComponent] = match &attribute.kind {
        RelationKind::Embedded { components } => components,
        _ => &[],
    };
    match scope
        .child_names()
        .into_iter()
        .find(|name| !components.iter().any(|c| c.name == *name))
    {
        Some(name) => Err(MappingError::UnknownRelation {
            owner: path.to_string(),
            relation: name.to_string(),
        }),
        None => Ok(()),
    }
}

/// Identifier, discriminator and attribute fetches of `parent.entity`.
pub fn entity_body(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    parent: &FetchParent<'_>,
    mapping: EntityMapping<'_>,
) -> Result<EntityBody> {
    let entity = parent.entity;
    let group = &parent.table_group;

    let id_name = &entity.identifier.name;
    let id_columns = if mapping.id_columns.is_empty() {
        explicit_columns(chain, &relative_path(mapping.nature, id_name), &parent.path)?
            .unwrap_or(&[])
    } else {
        mapping.id_columns
    };
    let id_parts: Vec<&SelectablePart> = entity.identifier.columns.iter().collect();
    let identifier = state.bind(&parent.path.append(id_name), id_columns, &id_parts, group)?;

    let discriminator = match (&entity.discriminator, mapping.discriminator_column) {
        (Some(part), column) => {
            let columns: Vec<String> = column.map(|c| vec![c.to_string()]).unwrap_or_default();
            Some(state.bind_one(&parent.path, &columns, part, group)?)
        }
        (None, Some(column)) => {
            return Err(MappingError::unsupported(
                &parent.path,
                format!(
                    "entity '{}' has no discriminator to bind '{}' to",
                    entity.name, column
                ),
            ))
        }
        (None, None) => None,
    };

    let fetches = generate_attribute_fetches(state, chain, parent, mapping.nature)?;
    Ok(EntityBody {
        identifier,
        discriminator,
        fetches,
    })
}

/// One fetch per attribute of the parent entity, in declaration order.
///
/// Explicit builders run before defaults so their column bindings win for
/// any physical column a default would also read.
pub fn generate_attribute_fetches(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    parent: &FetchParent<'_>,
    nature: Option<CollectionNature>,
) -> Result<Vec<Fetch>> {
    let attributes = &parent.entity.attributes;
    let mut slots: Vec<Option<Fetch>> = attributes.iter().map(|_| None).collect();

    for (slot, attribute) in slots.iter_mut().zip(attributes) {
        if let Some(builder) = chain.resolve(&relative_path(nature, &attribute.name)) {
            *slot = Some(builder.build_fetch(state, chain, parent)?);
        }
    }

    let mut fetches = Vec::with_capacity(attributes.len());
    for (slot, attribute) in slots.into_iter().zip(attributes) {
        let fetch = match slot {
            Some(fetch) => fetch,
            None => default_fetch(state, chain, parent, attribute, nature)?,
        };
        fetches.push(fetch);
    }
    Ok(fetches)
}

fn default_fetch(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    parent: &FetchParent<'_>,
    attribute: &AttributeDescriptor,
    nature: Option<CollectionNature>,
) -> Result<Fetch> {
    let path = parent.path.append(&attribute.name);
    match &attribute.kind {
        RelationKind::Basic { .. } | RelationKind::Embedded { .. } => {
            let prefix = format!("{}.", relative_path(nature, &attribute.name));
            value_fetch(state, chain, path, attribute, &parent.table_group, &prefix)
        }
        RelationKind::ToOne { target, key } => {
            delayed_to_one(state, path, target, key, &[], &parent.table_group)
        }
        RelationKind::Plural { .. } => Ok(Fetch::Collection(CollectionFetch {
            path,
            timing: FetchTiming::Delayed,
            table_alias: None,
            key: Vec::new(),
            index: None,
            element: None,
        })),
    }
}

/// Basic or embedded attribute read from `group`. Embedded components look up
/// explicit columns under `component_prefix` + component name.
pub fn value_fetch(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    path: RelationPath,
    attribute: &AttributeDescriptor,
    group: &TableGroup,
    component_prefix: &str,
) -> Result<Fetch> {
    match &attribute.kind {
        RelationKind::Basic { column } => {
            let selection = state.bind_one(&path, &[], column, group)?;
            Ok(Fetch::Basic(BasicFetch { path, selection }))
        }
        RelationKind::Embedded { components } => {
            let mut fetched = Vec::with_capacity(components.len());
            for component in components {
                let relative = format!("{}{}", component_prefix, component.name);
                let columns = explicit_columns(chain, &relative, &path)?.unwrap_or(&[]);
                fetched.push(component_fetch(state, &path, component, columns, group)?);
            }
            Ok(Fetch::Embedded(EmbeddedFetch {
                path,
                components: fetched,
            }))
        }
        RelationKind::ToOne { .. } | RelationKind::Plural { .. } => Err(MappingError::unsupported(
            &path,
            "association handled as a value attribute",
        )),
    }
}

pub fn component_fetch(
    state: &mut CreationState<'_>,
    path: &RelationPath,
    component: &EmbeddedComponent,
    columns: &[String],
    group: &TableGroup,
) -> Result<EmbeddedComponentFetch> {
    let selection = state.bind_one(&path.append(&component.name), columns, &component.column, group)?;
    Ok(EmbeddedComponentFetch {
        name: component.name.clone(),
        selection,
    })
}

/// To-one that only carries its foreign key, read from the owner group.
pub fn delayed_to_one(
    state: &mut CreationState<'_>,
    path: RelationPath,
    target: &str,
    key: &KeyDescriptor,
    columns: &[String],
    owner_group: &TableGroup,
) -> Result<Fetch> {
    let key = state.bind(&path, columns, &key_parts(key), owner_group)?;
    Ok(Fetch::Entity(EntityFetch {
        path,
        entity: target.to_string(),
        timing: FetchTiming::Delayed,
        table_alias: None,
        key,
        identifier: Vec::new(),
        discriminator: None,
        fetches: Vec::new(),
    }))
}

/// Immediate to-one: foreign key in the owner group, target in `group`.
pub fn to_one_fetch(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    path: &RelationPath,
    attribute: &AttributeDescriptor,
    owner_group: &Arc<TableGroup>,
    group: &Arc<TableGroup>,
    mapping: EntityMapping<'_>,
) -> Result<Fetch> {
    let RelationKind::ToOne { target, key } = &attribute.kind else {
        return Err(MappingError::unsupported(path, "expected a to-one association"));
    };
    let key = state.bind(path, &[], &key_parts(key), owner_group)?;
    let entity = state.entity(target)?;
    let parent = FetchParent {
        path: path.clone(),
        entity,
        table_group: group.clone(),
    };
    let body = entity_body(state, chain, &parent, mapping)?;

    Ok(Fetch::Entity(EntityFetch {
        path: parent.path,
        entity: entity.name.clone(),
        timing: FetchTiming::Immediate,
        table_alias: Some(group.alias().to_string()),
        key,
        identifier: body.identifier,
        discriminator: body.discriminator,
        fetches: body.fetches,
    }))
}

/// Immediate collection read from its joined group.
///
/// `index` and a basic `element` take explicit columns from the scope under
/// those names; entity elements are generated with `mapping`.
pub fn collection_fetch(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    path: &RelationPath,
    attribute: &AttributeDescriptor,
    group: &Arc<TableGroup>,
    mapping: EntityMapping<'_>,
) -> Result<Fetch> {
    let RelationKind::Plural {
        key,
        element,
        index,
        ..
    } = &attribute.kind
    else {
        return Err(MappingError::unsupported(path, "expected a plural attribute"));
    };

    let key = state.bind(path, &[], &key_parts(key), group)?;

    let index = match index {
        Some(part) => {
            let name = CollectionNature::Index.as_str();
            let columns = explicit_columns(chain, name, path)?.unwrap_or(&[]);
            Some(state.bind_one(&path.append(name), columns, part, group)?)
        }
        None => None,
    };

    let element_name = CollectionNature::Element.as_str();
    let element_path = path.append(element_name);
    let element = match element {
        CollectionElement::Basic(part) => {
            let columns = explicit_columns(chain, element_name, path)?.unwrap_or(&[]);
            let selection = state.bind_one(&element_path, columns, part, group)?;
            CollectionElementFetch::Basic(BasicFetch {
                path: element_path,
                selection,
            })
        }
        CollectionElement::Entity(target) => {
            let entity = state.entity(target)?;
            let parent = FetchParent {
                path: element_path,
                entity,
                table_group: group.clone(),
            };
            let body = entity_body(state, chain, &parent, mapping)?;
            CollectionElementFetch::Entity(EntityFetch {
                path: parent.path,
                entity: entity.name.clone(),
                timing: FetchTiming::Immediate,
                table_alias: Some(group.alias().to_string()),
                key: Vec::new(),
                identifier: body.identifier,
                discriminator: body.discriminator,
                fetches: body.fetches,
            })
        }
    };

    Ok(Fetch::Collection(CollectionFetch {
        path: path.clone(),
        timing: FetchTiming::Immediate,
        table_alias: Some(group.alias().to_string()),
        key,
        index,
        element: Some(element),
    }))
}

/// Standard generation for a relation builder without an entity delegate.
pub fn generate_relation_fetch(
    state: &mut CreationState<'_>,
    chain: FetchResolverChain<'_>,
    path: &RelationPath,
    attribute: &AttributeDescriptor,
    owner_group: &Arc<TableGroup>,
    group: &Arc<TableGroup>,
) -> Result<Fetch> {
    match &attribute.kind {
        RelationKind::Basic { .. } | RelationKind::Embedded { .. } => {
            value_fetch(state, chain, path.clone(), attribute, group, "")
        }
        RelationKind::ToOne { .. } => to_one_fetch(
            state,
            chain,
            path,
            attribute,
            owner_group,
            group,
            EntityMapping::standard(None),
        ),
        RelationKind::Plural { .. } => collection_fetch(
            state,
            chain,
            path,
            attribute,
            group,
            EntityMapping::standard(Some(CollectionNature::Element)),
        ),
    }
}
