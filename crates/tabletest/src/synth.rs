//! Turns GIVEN literals into complete, referentially closed rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use tabletest_schema::{ColumnType, Schema};
use tracing::debug;

use crate::config::TableTestConfig;
use crate::error::FixtureError;
use crate::placeholder::{Cell, Placeholders};

/// One row to insert, keyed by column name.
pub type Row = Map<String, Value>;

/// One literal body row, keyed by header name.
pub type LiteralRecord = BTreeMap<String, String>;

/// Rows grouped by table, tables in catalog order.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    tables: Vec<(Arc<Schema>, Vec<Row>)>,
}

impl RowSet {
    /// An empty row set over `schemas`.
    pub fn new(schemas: &[Arc<Schema>]) -> Self {
        Self { tables: schemas.iter().map(|s| (Arc::clone(s), Vec::new())).collect() }
    }

    /// Rows for `table`; empty when the table has none or is unknown.
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables
            .iter()
            .find(|(s, _)| s.name == table)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }

    /// Appends rows for `schema`, adding the table if it is not present.
    pub fn extend(&mut self, schema: &Arc<Schema>, rows: impl IntoIterator<Item = Row>) {
        match self.tables.iter_mut().find(|(s, _)| s.name == schema.name) {
            Some((_, existing)) => existing.extend(rows),
            None => self.tables.push((Arc::clone(schema), rows.into_iter().collect())),
        }
    }

    /// Tables that have at least one row, in catalog order.
    pub fn schemas(&self) -> Vec<Arc<Schema>> {
        self.tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(s, _)| Arc::clone(s))
            .collect()
    }

    /// Every table with its rows, including tables without any.
    pub fn tables(&self) -> &[(Arc<Schema>, Vec<Row>)] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Schema>, &[Row])> {
        self.tables.iter().map(|(s, rows)| (s, rows.as_slice()))
    }

    /// Total rows across all tables.
    pub fn len(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves GIVEN literals into rows.
///
/// The placeholder map is threaded through by value: it goes in with the
/// bindings made so far and comes back with any new ones.
pub trait Synthesizer {
    fn synthesize(
        &mut self,
        schemas: &[Arc<Schema>],
        given: &[(Arc<Schema>, Vec<LiteralRecord>)],
        placeholders: Placeholders,
    ) -> Result<(RowSet, Placeholders), FixtureError>;
}

/// Fills every cell the fixture leaves open with a random value of the
/// column's type.
pub struct RandomSynthesizer {
    rng:    StdRng,
    marker: char,
}

impl RandomSynthesizer {
    /// `seed = None` seeds from OS entropy.
    pub fn new(marker: char, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng, marker }
    }

    pub fn from_config(config: &TableTestConfig) -> Self {
        Self::new(config.marker, config.seed)
    }

    /// Builds one full row per literal record of `schema`.
    ///
    /// Placeholder cells reuse the value already bound to the token or bind
    /// a fresh one. Literal cells are coerced to the column type. Columns the
    /// header leaves out get random values.
    pub fn expand(
        &mut self,
        schema: &Schema,
        records: &[LiteralRecord],
        mut placeholders: Placeholders,
    ) -> Result<(Vec<Row>, Placeholders), FixtureError> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            if let Some(column) = record.keys().find(|k| schema.column(k).is_none()) {
                return Err(FixtureError::UnknownColumn {
                    table:  schema.name.clone(),
                    column: column.clone(),
                });
            }

            let mut row = Row::new();
            for col in &schema.columns {
                let value = match record.get(&col.name).map(|c| Cell::classify(c, self.marker)) {
                    Some(Cell::Literal(text)) => coerce(col.col_type, text),
                    Some(Cell::Placeholder(name)) => match placeholders.get(name) {
                        Some(v) => v.clone(),
                        None => {
                            let v = self.random_value(col.col_type);
                            placeholders.insert(name, v.clone());
                            v
                        }
                    },
                    None => self.random_value(col.col_type),
                };
                row.insert(col.name.clone(), value);
            }
            rows.push(row);
        }
        Ok((rows, placeholders))
    }

    /// Adds rows until every foreign-key value in `rows` names an existing
    /// row of the target table.
    ///
    /// A synthesised target row carries the referring value in the
    /// referenced column and random values elsewhere; its own foreign keys
    /// are closed on the next pass. Null foreign keys reference nothing.
    pub fn close_references(&mut self, mut rows: RowSet) -> RowSet {
        loop {
            let mut missing: Vec<(Arc<Schema>, String, Value)> = Vec::new();
            for (schema, table_rows) in rows.iter() {
                for (col, reference) in schema.foreign_keys() {
                    for row in table_rows {
                        let Some(value) = row.get(&col.name).filter(|v| !v.is_null()) else {
                            continue;
                        };
                        let col_type = reference.column_type();
                        let value = coerce_value(col_type, value);
                        let target = reference.table();
                        let present = rows
                            .rows(&target.name)
                            .iter()
                            .filter_map(|r| r.get(reference.column()))
                            .any(|v| sql_eq(col_type, v, &value));
                        let queued = missing.iter().any(|(t, c, v)| {
                            t.name == target.name
                                && c == reference.column()
                                && sql_eq(col_type, v, &value)
                        });
                        if !present && !queued {
                            missing.push((Arc::clone(target), reference.column().to_string(), value));
                        }
                    }
                }
            }

            if missing.is_empty() {
                return rows;
            }
            debug!(rows = missing.len(), "synthesising referenced rows");
            for (target, column, value) in missing {
                let mut row = self.random_row(&target);
                row.insert(column, value);
                rows.extend(&target, [row]);
            }
        }
    }

    fn random_row(&mut self, schema: &Schema) -> Row {
        schema
            .columns
            .iter()
            .map(|c| (c.name.clone(), self.random_value(c.col_type)))
            .collect()
    }

    fn random_value(&mut self, col_type: ColumnType) -> Value {
        match col_type {
            ColumnType::Int => Value::from(self.rng.gen_range(1..1_000_000_000_i64)),
            ColumnType::Real => Value::from(self.rng.gen_range(0.0..1_000_000.0_f64)),
            ColumnType::Text => Value::String(
                (&mut self.rng)
                    .sample_iter(&Alphanumeric)
                    .take(12)
                    .map(char::from)
                    .collect(),
            ),
            ColumnType::Blob => Value::Array((0..12).map(|_| Value::from(self.rng.gen::<u8>())).collect()),
        }
    }
}

impl Synthesizer for RandomSynthesizer {
    fn synthesize(
        &mut self,
        schemas: &[Arc<Schema>],
        given: &[(Arc<Schema>, Vec<LiteralRecord>)],
        mut placeholders: Placeholders,
    ) -> Result<(RowSet, Placeholders), FixtureError> {
        let mut rows = RowSet::new(schemas);
        for (schema, records) in given {
            let (expanded, next) = self.expand(schema, records, placeholders)?;
            placeholders = next;
            rows.extend(schema, expanded);
        }
        Ok((self.close_references(rows), placeholders))
    }
}

/// Literal cell text as a value of `col_type`. Text that does not parse as
/// the column's number type stays a string.
fn coerce(col_type: ColumnType, text: &str) -> Value {
    match col_type {
        ColumnType::Int => text.parse::<i64>().map_or_else(|_| Value::from(text), Value::from),
        ColumnType::Real => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| Value::from(text), Value::Number),
        ColumnType::Text | ColumnType::Blob => Value::from(text),
    }
}

fn coerce_value(col_type: ColumnType, value: &Value) -> Value {
    match value {
        Value::String(s) => coerce(col_type, s),
        Value::Number(n) if col_type == ColumnType::Text => Value::String(n.to_string()),
        other => other.clone(),
    }
}

/// Equality as SQLite sees it once both sides are stored in a `col_type`
/// column: `3` and `3.0` are the same number.
fn sql_eq(col_type: ColumnType, a: &Value, b: &Value) -> bool {
    match (coerce_value(col_type, a), coerce_value(col_type, b)) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (x, y) => x == y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabletest_schema::{Column, Reference};

    fn shop() -> Vec<Arc<Schema>> {
        let country = Arc::new(Schema::new("Country", vec![
            Column::new("code", ColumnType::Text),
            Column::new("name", ColumnType::Text),
        ]));
        let user = Arc::new(Schema::new("User", vec![
            Column::new("name", ColumnType::Text),
            Column::new("country", ColumnType::Text)
                .referencing(Reference::new(Arc::clone(&country), "code").unwrap()),
        ]));
        vec![country, user]
    }

    fn record(pairs: &[(&str, &str)]) -> LiteralRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn literal_cells_are_coerced() {
        let schema = Schema::new("m", vec![
            Column::new("id", ColumnType::Int),
            Column::new("score", ColumnType::Real),
            Column::new("note", ColumnType::Text),
        ]);
        let mut synth = RandomSynthesizer::new(':', Some(1));
        let (rows, _) = synth
            .expand(&schema, &[record(&[("id", "7"), ("score", "2.5"), ("note", "42")])], Placeholders::default())
            .unwrap();
        assert_eq!(rows[0]["id"], json!(7));
        assert_eq!(rows[0]["score"], json!(2.5));
        assert_eq!(rows[0]["note"], json!("42"));

        let (rows, _) = synth
            .expand(&schema, &[record(&[("id", "seven")])], Placeholders::default())
            .unwrap();
        assert_eq!(rows[0]["id"], json!("seven"));
    }

    #[test]
    fn missing_columns_are_filled_by_type() {
        let schema = Schema::new("m", vec![
            Column::new("id", ColumnType::Int),
            Column::new("score", ColumnType::Real),
            Column::new("note", ColumnType::Text),
            Column::new("data", ColumnType::Blob),
        ]);
        let mut synth = RandomSynthesizer::new(':', Some(1));
        let (rows, placeholders) = synth
            .expand(&schema, &[record(&[])], Placeholders::default())
            .unwrap();
        assert!(placeholders.is_empty());
        assert!(rows[0]["id"].is_i64());
        assert!(rows[0]["score"].is_f64());
        assert!(rows[0]["note"].is_string());
        assert!(rows[0]["data"].is_array());
    }

    #[test]
    fn unknown_header_column() {
        let schemas = shop();
        let mut synth = RandomSynthesizer::new(':', Some(1));
        let err = synth
            .expand(&schemas[0], &[record(&[("iso", "GB")])], Placeholders::default())
            .unwrap_err();
        assert!(matches!(err, FixtureError::UnknownColumn { ref table, ref column }
            if table == "Country" && column == "iso"));
    }

    #[test]
    fn placeholders_are_shared_across_tables() {
        let schemas = shop();
        let given = vec![
            (Arc::clone(&schemas[0]), vec![record(&[("code", ":c")])]),
            (Arc::clone(&schemas[1]), vec![record(&[("name", "Bob"), ("country", ":c")])]),
        ];
        let mut synth = RandomSynthesizer::new(':', Some(3));
        let (rows, placeholders) = synth.synthesize(&schemas, &given, Placeholders::default()).unwrap();

        let c = placeholders.get("c").unwrap();
        assert_eq!(&rows.rows("Country")[0]["code"], c);
        assert_eq!(&rows.rows("User")[0]["country"], c);
        assert_eq!(rows.rows("Country").len(), 1);
    }

    #[test]
    fn references_are_closed_once_per_value() {
        let schemas = shop();
        let given = vec![(Arc::clone(&schemas[1]), vec![
            record(&[("name", "Bob"), ("country", "GB")]),
            record(&[("name", "Jim"), ("country", "GB")]),
            record(&[("name", "Ann"), ("country", "US")]),
        ])];
        let mut synth = RandomSynthesizer::new(':', Some(5));
        let (rows, _) = synth.synthesize(&schemas, &given, Placeholders::default()).unwrap();

        let codes: Vec<_> = rows.rows("Country").iter().map(|r| r["code"].clone()).collect();
        assert_eq!(codes, vec![json!("GB"), json!("US")]);
        assert_eq!(rows.len(), 5);
        let names: Vec<_> = rows.schemas().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["Country", "User"]);
    }

    #[test]
    fn closure_follows_chains() {
        let a = Arc::new(Schema::new("A", vec![Column::new("id", ColumnType::Int)]));
        let b = Arc::new(Schema::new("B", vec![
            Column::new("id", ColumnType::Int),
            Column::new("a", ColumnType::Int).referencing(Reference::new(Arc::clone(&a), "id").unwrap()),
        ]));
        let c = Arc::new(Schema::new("C", vec![
            Column::new("b", ColumnType::Int).referencing(Reference::new(Arc::clone(&b), "id").unwrap()),
        ]));
        let schemas = vec![a, b, Arc::clone(&c)];

        let mut synth = RandomSynthesizer::new(':', Some(9));
        let (rows, _) = synth
            .synthesize(&schemas, &[(c, vec![record(&[("b", "3")])])], Placeholders::default())
            .unwrap();

        assert_eq!(rows.rows("B").len(), 1);
        assert_eq!(rows.rows("B")[0]["id"], json!(3));
        assert_eq!(rows.rows("A").len(), 1);
        assert_eq!(rows.rows("A")[0]["id"], rows.rows("B")[0]["a"]);
    }

    #[test]
    fn numeric_references_match_across_types() {
        let parent = Arc::new(Schema::new("P", vec![
            Column::new("id", ColumnType::Real),
            Column::new("name", ColumnType::Text),
        ]));
        let child = Arc::new(Schema::new("C", vec![
            Column::new("name", ColumnType::Text),
            Column::new("p", ColumnType::Int)
                .referencing(Reference::new(Arc::clone(&parent), "id").unwrap()),
        ]));
        let schemas = vec![Arc::clone(&parent), Arc::clone(&child)];
        let given = vec![
            (parent, vec![record(&[("id", "3"), ("name", "x")])]),
            (child, vec![record(&[("name", "c"), ("p", "3")])]),
        ];

        let mut synth = RandomSynthesizer::new(':', Some(2));
        let (rows, _) = synth.synthesize(&schemas, &given, Placeholders::default()).unwrap();
        assert_eq!(rows.rows("P").len(), 1);
        assert_eq!(rows.rows("P")[0]["id"], json!(3.0));
        assert_eq!(rows.rows("C")[0]["p"], json!(3));
    }

    #[test]
    fn sql_equality_of_numbers() {
        assert!(sql_eq(ColumnType::Real, &json!(3), &json!(3.0)));
        assert!(sql_eq(ColumnType::Int, &json!("3"), &json!(3)));
        assert!(!sql_eq(ColumnType::Int, &json!(3), &json!(4)));
        assert!(!sql_eq(ColumnType::Text, &json!("GB"), &json!("gb")));
    }

    #[test]
    fn null_references_need_no_target() {
        let schemas = shop();
        let mut rows = RowSet::new(&schemas);
        let mut row = Row::new();
        row.insert("name".into(), json!("Bob"));
        row.insert("country".into(), Value::Null);
        rows.extend(&schemas[1], [row]);

        let mut synth = RandomSynthesizer::new(':', Some(1));
        let rows = synth.close_references(rows);
        assert!(rows.rows("Country").is_empty());
    }

    #[test]
    fn same_seed_same_rows() {
        let schemas = shop();
        let given = vec![(Arc::clone(&schemas[1]), vec![record(&[("name", ":n")])])];
        let run = |seed| {
            let mut synth = RandomSynthesizer::new(':', Some(seed));
            let (rows, p) = synth.synthesize(&schemas, &given, Placeholders::default()).unwrap();
            (rows.rows("User").to_vec(), rows.rows("Country").to_vec(), p)
        };
        assert_eq!(run(11), run(11));
    }
}
