//! Result set mapping declarations
//!
//! Everything a caller authors to describe a raw result:
//!
//! - [`result_set_mapping`]: the top-level container of root results and
//!   legacy fetches
//! - [`entity_builder`]: entity and scalar root results
//! - [`fetch_builder`]: property and relation fetches nested under them
//! - [`cache_key`]: the frozen, hashable form of all of the above
//! - [`document`]: the YAML form read by the `fetchplan` tool
//! - [`errors`]: declaration and compilation errors

pub mod cache_key;
pub mod document;
pub mod entity_builder;
pub mod errors;
pub mod fetch_builder;
pub mod result_set_mapping;

pub use cache_key::{CacheKeyForm, ResultSetMappingKey};
pub use entity_builder::{EntityResultBuilder, ScalarResultBuilder};
pub use errors::MappingError;
pub use fetch_builder::{FetchBuilder, LockMode, PropertyFetchBuilder, RelationFetchBuilder};
pub use result_set_mapping::{ResultBuilder, ResultSetMapping};
