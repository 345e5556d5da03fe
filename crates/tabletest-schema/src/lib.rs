//! # tabletest-schema
//!
//! Reads table declarations from a live database catalog, orders tables so
//! that foreign-key targets are written before the rows that reference
//! them, and writes fixture rows through `rusqlite`.
//!
//! ## Quick start
//!
//! ```no_run
//! use rusqlite::Connection;
//! use tabletest_schema::{introspect, order, SqliteCatalog};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.pragma_update(None, "foreign_keys", false).unwrap();
//! conn.execute_batch(
//!     "CREATE TABLE Country (code TEXT, name TEXT);
//!      CREATE TABLE User (name TEXT, country TEXT REFERENCES Country(code));",
//! ).unwrap();
//!
//! let schemas = introspect(&SqliteCatalog::new(&conn)).unwrap();
//! let ordered = order(&schemas).unwrap();
//! assert_eq!(ordered[0].name, "Country");
//! ```

pub mod catalog;
pub mod error;
pub mod order;
pub mod schema;
pub mod store;

// Re-exports for convenience.
pub use catalog::{introspect, Catalog, CatalogEntry, Engine, SqliteCatalog};
pub use error::SchemaError;
pub use order::{order, DependencyGraph};
pub use schema::{Column, ColumnType, Reference, Schema};
pub use store::{insert_all, insert_rows, query, quote_ident, ForeignKeysOff, ResultSet};
