//! fetchplan - Dynamic result/fetch mapping engine
//!
//! This crate turns a hand-written description of a raw SQL result set into an
//! executable assembly plan that rebuilds an object graph from each row:
//! - Declarative mapping trees (entity results, relation fetches, property columns)
//! - Join/table resolution against an already-resolved domain model
//! - Binding of explicit or default column names to result positions
//! - Structural cache keys and a shared cache of compiled plans

pub mod utils;

pub mod assembly;
pub mod config;
pub mod domain_model;
pub mod mapping;
pub mod plan_cache;
pub mod result_metadata;

pub use assembly::plan::AssemblyPlan;
pub use mapping::errors::MappingError;
pub use mapping::result_set_mapping::ResultSetMapping;
