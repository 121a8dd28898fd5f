//! Selection binding
//!
//! Turns (table alias, physical column) pairs into [`SqlSelection`]s pointing at
//! a position of the raw result. Each physical column is bound at most once per
//! compilation: the first binding wins and every later request for the same
//! column gets the same `Arc`, so an explicitly bound foreign key is reused by
//! the standard path instead of being re-resolved under its default name.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::assembly::alias_scope::TableGroup;
use crate::domain_model::{JdbcType, RelationPath, SelectablePart};
use crate::mapping::errors::{MappingError, Result};
use crate::result_metadata::ResultSetMetadata;

/// One bound column of the raw result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlSelection {
    /// Zero-based position in the raw result
    pub position: usize,
    /// Raw result column the value is read from
    pub column_alias: String,
    /// Alias of the table group owning the physical column; empty for scalars
    pub table_alias: String,
    /// Physical column (or the raw column, for scalars)
    pub column: String,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Default)]
pub struct SelectionRegistry {
    selections: HashMap<(String, String), Arc<SqlSelection>>,
}

impl SelectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn find(&self, table_alias: &str, column: &str) -> Option<Arc<SqlSelection>> {
        self.selections
            .get(&(table_alias.to_string(), column.to_string()))
            .cloned()
    }

    /// Bind `part`, qualified by `table_alias`, to raw column `column_alias`.
    pub fn resolve_sql_selection(
        &mut self,
        path: &RelationPath,
        table_alias: &str,
        part: &SelectablePart,
        column_alias: &str,
        metadata: &ResultSetMetadata,
    ) -> Result<Arc<SqlSelection>> {
        let key = (table_alias.to_string(), part.column.clone());
        if let Some(existing) = self.selections.get(&key) {
            if !existing.column_alias.eq_ignore_ascii_case(column_alias) {
                log::debug!(
                    "{}.{} already bound to '{}', ignoring '{}' at '{}'",
                    table_alias,
                    part.column,
                    existing.column_alias,
                    column_alias,
                    path
                );
            }
            return Ok(existing.clone());
        }

        let position = metadata
            .resolve_column_position(column_alias)
            .ok_or_else(|| {
                MappingError::unresolvable(
                    path,
                    format!("column '{}' is not part of the result", column_alias),
                )
            })?;
        let selection = Arc::new(SqlSelection {
            position,
            column_alias: column_alias.to_string(),
            table_alias: table_alias.to_string(),
            column: part.column.clone(),
            jdbc_type: part.jdbc_type,
        });
        self.selections.insert(key, selection.clone());
        Ok(selection)
    }

    /// Bind a raw column that belongs to no table group.
    pub fn resolve_scalar_selection(
        &mut self,
        column_alias: &str,
        jdbc_type: Option<JdbcType>,
        metadata: &ResultSetMetadata,
    ) -> Result<Arc<SqlSelection>> {
        let key = (String::new(), column_alias.to_lowercase());
        if let Some(existing) = self.selections.get(&key) {
            return Ok(existing.clone());
        }
        let position = metadata
            .resolve_column_position(column_alias)
            .ok_or_else(|| {
                MappingError::unresolvable(
                    column_alias,
                    "scalar column is not part of the result",
                )
            })?;
        let reported = metadata
            .column(position)
            .map(|c| c.data_type)
            .unwrap_or_default();
        let selection = Arc::new(SqlSelection {
            position,
            column_alias: column_alias.to_string(),
            table_alias: String::new(),
            column: column_alias.to_string(),
            jdbc_type: jdbc_type.unwrap_or(reported),
        });
        self.selections.insert(key, selection.clone());
        Ok(selection)
    }

    /// Bind `parts` inside `group`.
    ///
    /// With no explicit columns every part binds to its own column name. An
    /// explicit list must match the parts one to one and binds positionally:
    /// the Nth column goes to the Nth part.
    pub fn bind_columns(
        &mut self,
        path: &RelationPath,
        columns: &[String],
        parts: &[&SelectablePart],
        group: &TableGroup,
        metadata: &ResultSetMetadata,
    ) -> Result<Vec<Arc<SqlSelection>>> {
        if !columns.is_empty() && columns.len() != parts.len() {
            return Err(MappingError::unresolvable(
                path,
                format!(
                    "{} column(s) declared for {} selectable part(s)",
                    columns.len(),
                    parts.len()
                ),
            ));
        }

        let mut selections = Vec::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            let table_alias = group.resolve_table_reference(&part.table).ok_or_else(|| {
                MappingError::unresolvable(
                    path,
                    format!(
                        "table '{}' is not reachable from alias '{}'",
                        part.table,
                        group.alias()
                    ),
                )
            })?;
            let column_alias = columns
                .get(index)
                .map(String::as_str)
                .unwrap_or(part.column.as_str());
            selections.push(self.resolve_sql_selection(
                path,
                table_alias,
                part,
                column_alias,
                metadata,
            )?);
        }
        Ok(selections)
    }

    /// Every distinct selection, ordered by result position.
    pub fn selections_by_position(&self) -> Vec<Arc<SqlSelection>> {
        let mut selections: Vec<_> = self.selections.values().cloned().collect();
        selections.sort_by(|a, b| {
            (a.position, &a.table_alias, &a.column).cmp(&(b.position, &b.table_alias, &b.column))
        });
        selections
    }
}
