//! Materialized result rows.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

/// Column names shared across all rows of one result set.
///
/// Wrapped in `Arc` so every row from the same cursor shares one copy.
#[derive(Debug, Clone)]
pub struct ColumnNames {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnNames {
    /// Create column metadata from an ordered list of names.
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check whether there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name of the column at `index`.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// All column names in cursor order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from a query, with index and name access.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<ColumnNames>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row that owns fresh column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            columns: Arc::new(ColumnNames::new(column_names)),
            values,
        }
    }

    /// Create a row sharing column metadata with its result set.
    pub fn with_columns(columns: Arc<ColumnNames>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Shared column metadata, for building sibling rows.
    pub fn column_names(&self) -> Arc<ColumnNames> {
        Arc::clone(&self.columns)
    }

    /// Number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of a named column.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Consume the row, yielding its values in cursor order.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
