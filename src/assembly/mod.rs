//! Plan compilation
//!
//! Walks the declared result builders together with the domain model and the
//! raw result metadata and produces an [`AssemblyPlan`](plan::AssemblyPlan).
//!
//! # Module Structure
//!
//! - [`alias_scope`]: table groups and join resolution by relation path
//! - [`selection`]: binding physical columns to result positions
//! - [`resolver_chain`]: scoped lookup of explicit child builders
//! - [`creation_state`]: per-compilation state threaded through every build
//! - [`builder`]: the build protocol of each builder kind
//! - [`standard`]: fetch generation from the model defaults
//! - [`plan`]: the compiled plan types
//!
//! A compilation either produces a complete plan or fails; nothing partial
//! escapes.

pub mod alias_scope;
pub mod builder;
pub mod creation_state;
pub mod plan;
pub mod resolver_chain;
pub mod selection;
pub mod standard;

use crate::assembly::creation_state::CreationState;
use crate::assembly::plan::{AssemblyPlan, DomainResult};
use crate::domain_model::DomainModelLookup;
use crate::mapping::errors::Result;
use crate::mapping::result_set_mapping::ResultBuilder;
use crate::result_metadata::ResultSetMetadata;

/// Compile root results (legacy fetches already attached) into a plan.
pub fn compile(
    results: &[ResultBuilder],
    model: &dyn DomainModelLookup,
    metadata: &ResultSetMetadata,
) -> Result<AssemblyPlan> {
    let mut state = CreationState::new(model, metadata);

    let mut domain_results = Vec::with_capacity(results.len());
    for result in results {
        let built = match result {
            ResultBuilder::Entity(entity) => DomainResult::Entity(entity.build_result(&mut state)?),
            ResultBuilder::Scalar(scalar) => DomainResult::Scalar(scalar.build_result(&mut state)?),
        };
        domain_results.push(built);
    }

    let joins = state.aliases().len();
    let selections = state.into_selections().selections_by_position();
    log::debug!(
        "Compiled {} result(s) over {} table group(s) reading {} of {} column(s)",
        domain_results.len(),
        joins,
        selections.len(),
        metadata.column_count()
    );

    Ok(AssemblyPlan::new(domain_results, selections))
}
