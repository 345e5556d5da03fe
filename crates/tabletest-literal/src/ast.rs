// ─────────────────────────────────────────────
// Parsed fixture structures
// ─────────────────────────────────────────────

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LiteralError;

// ── Table literals ────────────────────────────────────────

/// An ASCII bordered table: one header row and one or more body rows.
///
/// Every body row has exactly as many cells as the header. The parser
/// rejects tables that break this, and [`TableLiteral::new`] checks it for
/// tables built by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLiteral {
    header: Vec<String>,
    rows:   Vec<Vec<String>>,
}

impl TableLiteral {
    /// Line of the first body row once the table is rendered
    /// (top border, header, separator come first).
    const FIRST_BODY_LINE: usize = 4;

    /// Build a literal from a header and body rows.
    ///
    /// A width mismatch is reported at the line the row would occupy in the
    /// rendered form of the table.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, LiteralError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(LiteralError::RowWidth {
                    line:     Self::FIRST_BODY_LINE + i,
                    expected: header.len(),
                    found:    row.len(),
                });
            }
        }
        Ok(Self { header, rows })
    }

    pub(crate) fn from_parts_unchecked(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Column names, in the order they appear in the header.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Body rows, each as wide as the header.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zip the header against every body row.
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.header
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

// ── GIVEN sections ────────────────────────────────────────

/// One `SELECT * FROM <table>;` header and the literal that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GivenTable {
    pub table:   String,
    pub literal: TableLiteral,
    /// Line of the `SELECT` header within the GIVEN text.
    pub line:    usize,
}

// ── Catalog declarations ──────────────────────────────────

/// Column storage types understood by the declaration grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Blob,
    Int,
    Real,
    Text,
}

impl ColumnType {
    /// SQL spelling, exactly as the grammar accepts it.
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Blob => "BLOB",
            ColumnType::Int  => "INT",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "BLOB" => Some(ColumnType::Blob),
            "INT"  => Some(ColumnType::Int),
            "REAL" => Some(ColumnType::Real),
            "TEXT" => Some(ColumnType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `REFERENCES <table>(<column>)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table:  String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDecl {
    pub name:       String,
    pub col_type:   ColumnType,
    pub references: Option<ForeignKey>,
}

/// A parsed `CREATE TABLE` statement. The table's own name is not part of
/// it: callers know it from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub columns: Vec<ColumnDecl>,
}

impl Declaration {
    /// Foreign keys in column order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.columns.iter().filter_map(|c| c.references.as_ref())
    }
}
