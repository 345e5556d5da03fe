//! # tabletest-literal
//!
//! Grammar for the fixture language: ASCII bordered tables, `SELECT * FROM`
//! headers and the reduced `CREATE TABLE` column grammar used when reading a
//! database catalog.
//!
//! ```text
//! SELECT * FROM User;
//! +------+---------+
//! | name | country |
//! +------+---------+
//! | Bob  | :c      |
//! | Jim  | GB      |
//! +------+---------+
//! ```

pub mod ast;
pub mod doc;
pub mod error;
pub mod parser;
pub mod render;

pub use ast::{ColumnDecl, ColumnType, Declaration, ForeignKey, GivenTable, TableLiteral};
pub use doc::{dedent, split_sections, Sections};
pub use error::LiteralError;
pub use parser::{parse_declaration, parse_given, parse_row, parse_table};
pub use render::render;
