//! Raw result set metadata
//!
//! Column names and types of the tabular result a mapping is compiled against.
//! Positions are zero-based and follow the order the columns were reported in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain_model::JdbcType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: JdbcType,
}

impl ColumnDescriptor {
    pub fn new(name: &str, data_type: JdbcType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
        }
    }
}

/// Ordered column descriptors with case-insensitive name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSetMetadata {
    columns: Vec<ColumnDescriptor>,
    positions: HashMap<String, usize>,
}

impl ResultSetMetadata {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        let mut positions = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            // First occurrence wins for duplicated labels.
            positions
                .entry(column.name.to_lowercase())
                .or_insert(position);
        }
        Self { columns, positions }
    }

    /// Shorthand for tests and tools: every column typed as varchar.
    pub fn from_names(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|n| ColumnDescriptor::new(n, JdbcType::Varchar))
                .collect(),
        )
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn resolve_column_position(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }

    pub fn column(&self, position: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(position)
    }
}
