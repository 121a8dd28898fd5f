//! Error types for mapping declaration and plan compilation.
//!
//! Every variant aborts the enclosing compilation; nothing is retried and no
//! partial plan is produced or cached.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("Relation `{relation}` is already mapped under `{owner}`")]
    DuplicateMapping { owner: String, relation: String },

    #[error("Cannot add column `{column}` to `{relation}`: no explicit column list was declared")]
    InvalidMappingState { relation: String, column: String },

    #[error("No relation `{relation}` on `{owner}`")]
    UnknownRelation { owner: String, relation: String },

    #[error("Unknown entity `{entity}`")]
    UnknownEntity { entity: String },

    #[error("No table alias `{alias}` is registered (referenced by `{relation}`)")]
    UnknownOwnerAlias { alias: String, relation: String },

    #[error("Table alias `{alias}` is already registered for `{existing}`")]
    DuplicateAlias { alias: String, existing: String },

    #[error("Cannot bind columns for `{path}`: {reason}")]
    UnresolvableColumn { path: String, reason: String },

    #[error("Unsupported mapping shape at `{path}`: {reason}")]
    UnsupportedMappingShape { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MappingError>;

impl MappingError {
    pub(crate) fn unresolvable(path: impl ToString, reason: impl Into<String>) -> Self {
        MappingError::UnresolvableColumn {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(path: impl ToString, reason: impl Into<String>) -> Self {
        MappingError::UnsupportedMappingShape {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
