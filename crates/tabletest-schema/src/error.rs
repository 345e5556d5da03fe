use tabletest_literal::LiteralError;
use thiserror::Error;

/// Errors that can occur while reading a catalog or writing fixture rows.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// An error originating from the underlying SQLite database.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A catalog declaration outside the supported column grammar.
    #[error("Invalid declaration for table {table}: {source}")]
    Declaration {
        table: String,
        #[source]
        source: LiteralError,
    },

    /// A foreign key names a table that is not (yet) in the catalog.
    #[error("Unknown table {table} referenced by {referenced_by}")]
    UnknownTable { table: String, referenced_by: String },

    /// A foreign key names a column its target table does not have.
    #[error("Unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },

    /// The tables' foreign keys form a cycle.
    #[error("Dependency cycle between tables: {}", tables.join(", "))]
    DependencyCycle { tables: Vec<String> },

    /// The configured engine name is not supported.
    #[error("Unsupported engine: {0}")]
    UnsupportedEngine(String),
}
