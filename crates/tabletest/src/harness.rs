use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use rusqlite::{Connection, DropBehavior};
use tabletest_literal::{parse_given, split_sections, GivenTable};
use tabletest_schema::{insert_all, introspect, order, query, ForeignKeysOff, ResultSet, Schema};
use tracing::{debug, info, instrument, warn};

use crate::config::TableTestConfig;
use crate::error::FixtureError;
use crate::placeholder::Placeholders;
use crate::synth::{RandomSynthesizer, RowSet, Synthesizer};

/// Entry point: holds the introspected catalog of one database and turns
/// fixture documents into runnable [`Fixture`]s.
///
/// Table names are matched ASCII case-insensitively, as SQLite does.
pub struct Harness {
    config:  TableTestConfig,
    schemas: Vec<Arc<Schema>>,
    by_name: HashMap<String, Arc<Schema>>,
}

impl Harness {
    /// Introspects `conn`'s catalog through the configured engine.
    #[instrument(skip_all, fields(engine = ?config.engine))]
    pub fn new(conn: &Connection, config: TableTestConfig) -> Result<Self, FixtureError> {
        let catalog = config.engine.catalog(conn);
        let schemas = introspect(catalog.as_ref())?;
        let by_name = schemas
            .iter()
            .map(|s| (s.name.to_ascii_lowercase(), Arc::clone(s)))
            .collect();
        info!(tables = schemas.len(), "catalog introspected");
        Ok(Self { config, schemas, by_name })
    }

    pub fn config(&self) -> &TableTestConfig {
        &self.config
    }

    /// Every user table, in catalog order.
    pub fn schemas(&self) -> &[Arc<Schema>] {
        &self.schemas
    }

    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.by_name.get(&name.to_ascii_lowercase())
    }

    /// Parses and resolves `doc` with a [`RandomSynthesizer`] built from the
    /// harness configuration.
    pub fn fixture(&self, doc: &str) -> Result<Fixture, FixtureError> {
        let mut synth = RandomSynthesizer::from_config(&self.config);
        self.fixture_with(doc, &mut synth)
    }

    /// Parses and resolves `doc` with `synth`.
    ///
    /// Nothing touches the database here: every fixture error is reported
    /// before [`Fixture::run`] writes a row.
    pub fn fixture_with(
        &self,
        doc: &str,
        synth: &mut dyn Synthesizer,
    ) -> Result<Fixture, FixtureError> {
        let sections = split_sections(doc)?;
        let given = parse_given(&sections.given)?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut records = Vec::with_capacity(given.len());
        for table in &given {
            let schema = self.schema(&table.table).ok_or_else(|| FixtureError::UnknownTable {
                table: table.table.clone(),
                line:  table.line,
            })?;
            if !seen.insert(schema.name.as_str()) {
                return Err(FixtureError::DuplicateGivenTable {
                    table: table.table.clone(),
                    line:  table.line,
                });
            }
            records.push((Arc::clone(schema), table.literal.records()));
        }

        let (rows, placeholders) =
            synth.synthesize(&self.schemas, &records, Placeholders::new(self.config.marker))?;
        let insert_order = order(&rows.schemas())?;
        debug!(
            tables = insert_order.len(),
            rows = rows.len(),
            statements = sections.when.len(),
            "fixture resolved"
        );

        Ok(Fixture {
            given,
            statements: sections.when,
            rows,
            order: insert_order,
            placeholders,
        })
    }

    /// [`fixture`](Self::fixture) followed by [`Fixture::run`].
    pub fn run<T, E, F>(&self, conn: &mut Connection, doc: &str, f: F) -> Result<T, FixtureError>
    where
        F: FnOnce(&[ResultSet], &Placeholders) -> Result<T, E>,
        E: Display,
    {
        self.fixture(doc)?.run(conn, f)
    }
}

/// A resolved fixture: concrete rows, their insertion order, and the WHEN
/// statements. Running it never leaves anything behind in the database.
#[derive(Debug, Clone)]
pub struct Fixture {
    given:        Vec<GivenTable>,
    statements:   Vec<String>,
    rows:         RowSet,
    order:        Vec<Arc<Schema>>,
    placeholders: Placeholders,
}

impl Fixture {
    /// GIVEN tables as written.
    pub fn given(&self) -> &[GivenTable] {
        &self.given
    }

    /// WHEN statements, one per non-blank line.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Every row that will be inserted, including synthesised ones.
    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    /// Tables in insertion order.
    pub fn order(&self) -> &[Arc<Schema>] {
        &self.order
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    /// Inserts the rows, runs the WHEN statements and hands their results
    /// to `f`, all inside one transaction that is always rolled back.
    ///
    /// Foreign-key enforcement is switched off for the run and restored
    /// afterwards. An `Err` from `f` becomes [`FixtureError::Assertion`]. A
    /// panic in `f` unwinds through both guards: the transaction rolls back,
    /// then enforcement is restored.
    #[instrument(skip_all, fields(tables = self.order.len(), statements = self.statements.len()))]
    pub fn run<T, E, F>(&self, conn: &mut Connection, f: F) -> Result<T, FixtureError>
    where
        F: FnOnce(&[ResultSet], &Placeholders) -> Result<T, E>,
        E: Display,
    {
        let conn: &Connection = conn;
        let _foreign_keys = ForeignKeysOff::new(conn)?;
        let mut tx = conn.unchecked_transaction()?;
        tx.set_drop_behavior(DropBehavior::Rollback);

        insert_all(&tx, self.rows.tables())?;

        let mut results = Vec::with_capacity(self.statements.len());
        for statement in &self.statements {
            results.push(query(&tx, statement)?);
        }

        let outcome = f(&results, &self.placeholders);
        tx.rollback()?;

        outcome.map_err(|e| {
            warn!(error = %e, "fixture assertion failed; changes rolled back");
            FixtureError::Assertion(e.to_string())
        })
    }
}
