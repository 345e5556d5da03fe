use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tabletest_literal::{parse_declaration, Declaration};
use tracing::{debug, instrument};

use crate::error::SchemaError;
use crate::schema::{Column, Reference, Schema};

/// One user table as the catalog lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// The `CREATE TABLE` statement the table was declared with.
    pub sql: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self { name: name.into(), sql: sql.into() }
    }
}

/// Source of table declarations for [`introspect`].
///
/// Implementations must list every foreign-key target before the tables that
/// reference it.
pub trait Catalog {
    fn declarations(&self) -> Result<Vec<CatalogEntry>, SchemaError>;
}

impl Catalog for Vec<CatalogEntry> {
    fn declarations(&self) -> Result<Vec<CatalogEntry>, SchemaError> {
        Ok(self.clone())
    }
}

/// Reads declarations from `sqlite_master`, in creation order.
///
/// Views and SQLite's internal tables are skipped.
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn declarations(&self) -> Result<Vec<CatalogEntry>, SchemaError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY rowid",
        )?;
        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)))?
            .filter_map(|r| match r {
                Ok((name, Some(sql))) => Some(Ok(CatalogEntry { name, sql })),
                Ok((_, None)) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

/// Relational engine whose catalog a harness reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Sqlite,
}

impl Engine {
    /// The catalog reader for this engine over `conn`.
    pub fn catalog<'c>(self, conn: &'c Connection) -> Box<dyn Catalog + 'c> {
        match self {
            Engine::Sqlite => Box::new(SqliteCatalog::new(conn)),
        }
    }
}

impl FromStr for Engine {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            other => Err(SchemaError::UnsupportedEngine(other.to_string())),
        }
    }
}

/// Builds one [`Schema`] per catalog table, in catalog order.
///
/// Every declaration is parsed first. Before any schema is built, each
/// foreign key is checked to name a table listed earlier in the catalog;
/// a forward or unknown reference fails with [`SchemaError::UnknownTable`].
#[instrument(skip_all)]
pub fn introspect(catalog: &dyn Catalog) -> Result<Vec<Arc<Schema>>, SchemaError> {
    let mut parsed: Vec<(String, Declaration)> = Vec::new();
    for entry in catalog.declarations()? {
        let decl = parse_declaration(&entry.sql).map_err(|source| SchemaError::Declaration {
            table: entry.name.clone(),
            source,
        })?;
        parsed.push((entry.name, decl));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (name, decl) in &parsed {
        for fk in decl.foreign_keys() {
            if !seen.contains(fk.table.as_str()) {
                return Err(SchemaError::UnknownTable {
                    table:         fk.table.clone(),
                    referenced_by: name.clone(),
                });
            }
        }
        seen.insert(name.as_str());
    }

    let mut schemas: Vec<Arc<Schema>> = Vec::with_capacity(parsed.len());
    for (name, decl) in parsed {
        let mut columns = Vec::with_capacity(decl.columns.len());
        for col in decl.columns {
            let mut column = Column::new(col.name, col.col_type);
            if let Some(fk) = col.references {
                let target = schemas
                    .iter()
                    .find(|s| s.name == fk.table)
                    .ok_or_else(|| SchemaError::UnknownTable {
                        table:         fk.table.clone(),
                        referenced_by: name.clone(),
                    })?;
                column = column.referencing(Reference::new(Arc::clone(target), fk.column)?);
            }
            columns.push(column);
        }
        debug!(table = %name, columns = columns.len(), "introspected table");
        schemas.push(Arc::new(Schema::new(name, columns)));
    }

    Ok(schemas)
}
