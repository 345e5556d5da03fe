use tabletest_literal::LiteralError;
use tabletest_schema::SchemaError;
use thiserror::Error;

/// Everything that can stop a fixture from being built or run.
///
/// `Literal`, `Schema`, `UnknownTable`, `UnknownColumn` and
/// `DuplicateGivenTable` are raised before any row is written. `Sqlite` and
/// `Assertion` are raised after the run's transaction has been rolled back.
#[derive(Debug, Error)]
pub enum FixtureError {
    // ── Fixture text ──────────────────────────────────────

    #[error(transparent)]
    Literal(#[from] LiteralError),

    #[error("GIVEN at line {line} names unknown table {table}")]
    UnknownTable { table: String, line: usize },

    #[error("GIVEN at line {line} names table {table} a second time")]
    DuplicateGivenTable { table: String, line: usize },

    #[error("table {table} has no column {column}")]
    UnknownColumn { table: String, column: String },

    // ── Catalog ───────────────────────────────────────────

    #[error(transparent)]
    Schema(SchemaError),

    // ── Run ───────────────────────────────────────────────

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("assertion failed: {0}")]
    Assertion(String),
}

impl From<SchemaError> for FixtureError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::Sqlite(e) => Self::Sqlite(e),
            other => Self::Schema(other),
        }
    }
}
