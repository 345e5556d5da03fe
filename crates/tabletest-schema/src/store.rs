use std::sync::Arc;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::SchemaError;
use crate::order::order;
use crate::schema::{ColumnType, Schema};

/// Rows returned by one statement, with the statement's column names.
///
/// Rows are positional so that joins returning two columns with the same
/// name keep both values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row as a JSON object keyed by column name. When two columns
    /// share a name the later one wins.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// All values of the first column called `name`.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(i)).collect())
    }
}

/// Turns SQLite's foreign-key enforcement off until dropped, then restores
/// the previous setting.
///
/// The declaration grammar cannot mark a parent column UNIQUE, and SQLite
/// refuses to insert into any table whose reference lacks one ("foreign key
/// mismatch") while enforcement is on. The bundled SQLite enables it by
/// default. The pragma is ignored inside an open transaction, so the guard
/// must be taken before the transaction starts.
pub struct ForeignKeysOff<'c> {
    conn:     &'c Connection,
    previous: bool,
}

impl<'c> ForeignKeysOff<'c> {
    pub fn new(conn: &'c Connection) -> Result<Self, SchemaError> {
        let previous: bool = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
        if previous {
            conn.pragma_update(None, "foreign_keys", false)?;
        }
        debug!(previous, "foreign key enforcement off");
        Ok(Self { conn, previous })
    }
}

impl Drop for ForeignKeysOff<'_> {
    fn drop(&mut self) {
        if self.previous {
            if let Err(e) = self.conn.pragma_update(None, "foreign_keys", true) {
                warn!(error = %e, "failed to restore foreign key enforcement");
            }
        }
    }
}

/// Inserts rows for several tables, referenced tables first.
///
/// Tables referenced by a table with rows are ordered in even when they
/// have no rows of their own. Expects foreign-key enforcement to be off
/// (see [`ForeignKeysOff`]). Returns the number of rows written.
#[instrument(skip_all, fields(tables = tables.len()))]
pub fn insert_all(
    conn: &Connection,
    tables: &[(Arc<Schema>, Vec<Map<String, Value>>)],
) -> Result<usize, SchemaError> {
    let with_rows: Vec<Arc<Schema>> = tables
        .iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(s, _)| Arc::clone(s))
        .collect();

    let mut written = 0;
    for schema in order(&with_rows)? {
        for (_, rows) in tables.iter().filter(|(s, _)| s.name == schema.name) {
            written += insert_rows(conn, &schema, rows)?;
        }
    }
    Ok(written)
}

/// Inserts `rows` into `schema`'s table with one prepared statement.
///
/// Every column of the schema is bound, in declaration order; a row that
/// lacks a column binds NULL for it. Returns the number of rows written.
/// Expects foreign-key enforcement to be off (see [`ForeignKeysOff`]).
#[instrument(skip_all, fields(table = %schema.name, rows = rows.len()))]
pub fn insert_rows(
    conn: &Connection,
    schema: &Schema,
    rows: &[Map<String, Value>],
) -> Result<usize, SchemaError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let columns: Vec<String> = schema.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&schema.name),
        columns.join(", "),
        placeholders.join(", ")
    );
    debug!("INSERT SQL: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    for row in rows {
        let values = schema
            .columns
            .iter()
            .map(|col| json_value_to_sql(row.get(&col.name).unwrap_or(&Value::Null), col.col_type));
        stmt.execute(params_from_iter(values))?;
    }

    debug!("Inserted {} rows into {}", rows.len(), schema.name);
    Ok(rows.len())
}

/// Runs a single statement and collects every row it returns.
///
/// Statements that return nothing (DML, DDL) yield an empty result set.
#[instrument(skip_all, fields(sql = %sql))]
pub fn query(conn: &Connection, sql: &str) -> Result<ResultSet, SchemaError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(sql_value_to_json(row.get_ref(i)?));
        }
        result.push(values);
    }

    debug!("Query returned {} rows", result.len());
    Ok(ResultSet { columns, rows: result })
}

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// -----------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------

/// Converts a JSON value into an owned SQLite value for binding. Strings
/// bound to BLOB columns become their UTF-8 bytes; arrays of small integers
/// become raw bytes.
fn json_value_to_sql(val: &Value, col_type: ColumnType) -> SqlValue {
    match val {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        }
        Value::String(s) if col_type == ColumnType::Blob => SqlValue::Blob(s.as_bytes().to_vec()),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(items) if col_type == ColumnType::Blob => {
            match items
                .iter()
                .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
            {
                Some(bytes) => SqlValue::Blob(bytes),
                None => SqlValue::Text(val.to_string()),
            }
        }
        Value::Array(_) | Value::Object(_) => SqlValue::Text(val.to_string()),
    }
}

fn sql_value_to_json(val: ValueRef<'_>) -> Value {
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Number(n.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
    }
}
