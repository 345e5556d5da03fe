use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

pub use tabletest_literal::ColumnType;

use crate::error::SchemaError;

/// Describes one table: its name and ordered columns.
///
/// Schemas are immutable once built and shared as `Arc<Schema>`; a
/// [`Reference`] points at its target through such an `Arc`, so a target
/// always exists before anything referring to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    /// The name of the table, as the catalog reports it.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

/// A single column within a [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// The column name.
    pub name: String,
    /// The declared storage type.
    pub col_type: ColumnType,
    /// Foreign key, if the column declares one.
    pub references: Option<Reference>,
}

/// A foreign-key edge to a column of another table.
#[derive(Clone)]
pub struct Reference {
    table: Arc<Schema>,
    column: String,
    col_type: ColumnType,
}

impl Schema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self { name: name.into(), columns }
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Foreign keys declared by this table, in column order.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.columns.iter().filter_map(|c| c.references.as_ref())
    }

    /// Columns that carry a foreign key, paired with it.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Column, &Reference)> {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|r| (c, r)))
    }
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self { name: name.into(), col_type, references: None }
    }

    /// Attaches a foreign key to this column.
    pub fn referencing(mut self, reference: Reference) -> Self {
        self.references = Some(reference);
        self
    }
}

impl Reference {
    /// Creates a reference to `column` of `table`.
    ///
    /// Returns [`SchemaError::UnknownColumn`] if `table` has no such column.
    pub fn new(table: Arc<Schema>, column: impl Into<String>) -> Result<Self, SchemaError> {
        let column = column.into();
        let col_type = match table.column(&column) {
            Some(target) => target.col_type,
            None => return Err(SchemaError::UnknownColumn { table: table.name.clone(), column }),
        };
        Ok(Self { table, column, col_type })
    }

    /// The referenced table.
    pub fn table(&self) -> &Arc<Schema> {
        &self.table
    }

    /// Name of the referenced column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Declared type of the referenced column.
    pub fn column_type(&self) -> ColumnType {
        self.col_type
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.table.name == other.table.name && self.column == other.column
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({}.{})", self.table.name, self.column)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Reference", 2)?;
        s.serialize_field("table", &self.table.name)?;
        s.serialize_field("column", &self.column)?;
        s.end()
    }
}
