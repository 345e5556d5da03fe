//! # tabletest
//!
//! Declarative database fixtures. A fixture document has a GIVEN section of
//! `SELECT * FROM <table>;` headers each followed by an ASCII table, a blank
//! line, and a WHEN section of SQL statements:
//!
//! ```text
//! SELECT * FROM User;
//! +------+---------+
//! | name | country |
//! +------+---------+
//! | Bob  | :c      |
//! +------+---------+
//!
//! SELECT country FROM User
//! ```
//!
//! Columns the GIVEN tables leave out are filled with random values of the
//! right type, `:`-prefixed cells are placeholders that resolve to one value
//! everywhere they appear, and rows referenced through foreign keys are
//! synthesised. Rows are inserted in dependency order inside a transaction,
//! the WHEN results go to a test closure, and the transaction is rolled back.
//!
//! ```no_run
//! use rusqlite::Connection;
//! use tabletest::{Harness, TableTestConfig};
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch(
//!     "CREATE TABLE Country (code TEXT, name TEXT);
//!      CREATE TABLE User (name TEXT, country TEXT REFERENCES Country(code));",
//! ).unwrap();
//!
//! let harness = Harness::new(&conn, TableTestConfig::default()).unwrap();
//! let doc = "
//!     SELECT * FROM User;
//!     +------+---------+
//!     | name | country |
//!     +------+---------+
//!     | Bob  | GB      |
//!     +------+---------+
//!
//!     SELECT code FROM Country
//! ";
//! harness
//!     .run(&mut conn, doc, |results, _| {
//!         assert_eq!(results[0].rows[0][0], "GB");
//!         Ok::<_, String>(())
//!     })
//!     .unwrap();
//! ```

pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod placeholder;
pub mod synth;

pub use config::TableTestConfig;
pub use error::FixtureError;
pub use harness::{Fixture, Harness};
pub use placeholder::{Cell, Placeholders};
pub use synth::{LiteralRecord, RandomSynthesizer, Row, RowSet, Synthesizer};

pub use tabletest_literal::{GivenTable, LiteralError, TableLiteral};
pub use tabletest_schema::{Engine, ResultSet, Schema, SchemaError};
