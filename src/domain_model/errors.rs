//! # Domain Model Error Types
//!
//! Errors raised while loading and validating the domain model that mappings
//! are compiled against.
//!
//! - **Loading Errors**: file I/O and YAML parsing
//! - **Structural Errors**: duplicate names, dangling association targets,
//!   entities or keys without columns

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainModelError {
    #[error("Failed to read domain model file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse domain model: {error}")]
    ConfigParseError { error: String },
    #[error("Entity `{entity}` is declared more than once")]
    DuplicateEntity { entity: String },
    #[error("Attribute `{attribute}` is declared more than once on entity `{entity}`")]
    DuplicateAttribute { entity: String, attribute: String },
    #[error("Attribute `{entity}.{attribute}` targets unknown entity `{target}`")]
    UnknownTarget {
        entity: String,
        attribute: String,
        target: String,
    },
    #[error("Invalid entity `{entity}`: {message}")]
    InvalidEntity { entity: String, message: String },
}
