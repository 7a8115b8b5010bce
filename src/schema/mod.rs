//! Schema model: Source → Table → Column
//!
//! Pure data, as read from configuration or source discovery. The filter
//! engine rebuilds these values rather than mutating them, so the same
//! hierarchy can be filtered repeatedly with different rule sets.

use serde::{Deserialize, Serialize};

/// A data source: a registered origin of tabular data.
///
/// Carries no row-fetch capability itself; APIs are resolved separately
/// through [`crate::source::ApiRegistry`] keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Opaque unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Tables offered by this source, in discovery order
    pub tables: Vec<Table>,
}

/// A table within a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Identifier, unique within the source
    pub id: u64,
    /// Display name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
    /// Columns removed by structural filtering, kept for traceability
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_rm: Vec<Column>,
}

/// A column within a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Key used for name matching and row value lookup
    pub key: String,
}

impl Source {
    /// Create a source with the given tables
    pub fn new(id: impl Into<String>, name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tables,
        }
    }

    /// Rebuild this source with a replaced table sequence
    pub fn with_tables(&self, tables: Vec<Table>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            tables,
        }
    }
}

impl Table {
    /// Create a table with the given columns
    pub fn new(id: u64, name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            id,
            name: name.into(),
            columns,
            columns_rm: Vec::new(),
        }
    }

    /// Rebuild this table with replaced kept and removed column sequences
    pub fn with_columns(&self, columns: Vec<Column>, columns_rm: Vec<Column>) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            columns,
            columns_rm,
        }
    }
}

impl Column {
    /// Create a column from its key
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}
