use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use tracing::{debug, instrument};

use crate::ast::*;
use crate::error::LiteralError;

// ── Pest parser derive ─────────────────────────────────────

#[derive(Parser)]
#[grammar = "src/fixture.pest"]
pub struct FixtureParser;

// ── Public entry points ───────────────────────────────────

/// Parse a single row such as `| Bob | 21 |` into its cells.
pub fn parse_row(input: &str) -> Result<Vec<String>, LiteralError> {
    let pair = FixtureParser::parse(Rule::row_literal, input)?
        .find(|p| p.as_rule() == Rule::row)
        .ok_or_else(|| unexpected(1, 1, "expected a row"))?;
    Ok(cells(pair))
}

/// Parse one bordered table literal.
pub fn parse_table(input: &str) -> Result<TableLiteral, LiteralError> {
    let pair = FixtureParser::parse(Rule::table_literal, input)?
        .find(|p| p.as_rule() == Rule::table)
        .ok_or_else(|| unexpected(1, 1, "expected a table"))?;
    build_table(pair)
}

/// Parse a GIVEN section: one or more `SELECT * FROM <table>;` headers, each
/// followed by a table literal.
#[instrument(skip_all)]
pub fn parse_given(input: &str) -> Result<Vec<GivenTable>, LiteralError> {
    let pairs = FixtureParser::parse(Rule::given, input)?;

    let mut tables = Vec::new();
    for pair in pairs {
        match pair.as_rule() {
            Rule::given_table => tables.push(build_given_table(pair)?),
            Rule::EOI         => {}
            r => {
                let (line, column) = pair.as_span().start_pos().line_col();
                return Err(unexpected(line, column, &format!("unexpected rule: {r:?}")));
            }
        }
    }

    debug!(tables = tables.len(), "parsed GIVEN section");
    Ok(tables)
}

/// Parse a `CREATE TABLE` declaration in the reduced column grammar.
pub fn parse_declaration(input: &str) -> Result<Declaration, LiteralError> {
    let pair = FixtureParser::parse(Rule::declaration, input)?
        .find(|p| p.as_rule() == Rule::create_table)
        .ok_or_else(|| unexpected(1, 1, "expected CREATE TABLE"))?;

    let mut columns = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::column_decl => columns.push(build_column(inner)?),
            r => {
                let (line, column) = inner.as_span().start_pos().line_col();
                return Err(unexpected(line, column, &format!("unexpected in create_table: {r:?}")));
            }
        }
    }
    Ok(Declaration { columns })
}

// ── Tables ────────────────────────────────────────────────

fn build_given_table(pair: Pair<Rule>) -> Result<GivenTable, LiteralError> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut table = None;
    let mut literal = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::select_all => {
                let name = inner.into_inner()
                    .find(|p| p.as_rule() == Rule::ident)
                    .ok_or_else(|| unexpected(line, 1, "SELECT * FROM missing table name"))?;
                table = Some(name.as_str().to_string());
            }
            Rule::table => literal = Some(build_table(inner)?),
            r => return Err(unexpected(line, 1, &format!("unexpected in given_table: {r:?}"))),
        }
    }

    Ok(GivenTable {
        table:   table.ok_or_else(|| unexpected(line, 1, "missing SELECT header"))?,
        literal: literal.ok_or_else(|| unexpected(line, 1, "missing table literal"))?,
        line,
    })
}

fn build_table(pair: Pair<Rule>) -> Result<TableLiteral, LiteralError> {
    let (table_line, _) = pair.as_span().start_pos().line_col();
    let mut header: Option<Vec<String>> = None;
    let mut body: Vec<(usize, Vec<String>)> = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::header => {
                let row = inner.into_inner().next()
                    .ok_or_else(|| unexpected(table_line, 1, "empty header"))?;
                header = Some(cells(row));
            }
            Rule::body => {
                for row in inner.into_inner().filter(|p| p.as_rule() == Rule::row) {
                    let line = row.as_span().start_pos().line_col().0;
                    body.push((line, cells(row)));
                }
            }
            r => return Err(unexpected(table_line, 1, &format!("unexpected in table: {r:?}"))),
        }
    }

    let header = header.ok_or_else(|| unexpected(table_line, 1, "missing header row"))?;
    if let Some((line, row)) = body.iter().find(|(_, row)| row.len() != header.len()) {
        return Err(LiteralError::RowWidth {
            line:     *line,
            expected: header.len(),
            found:    row.len(),
        });
    }

    let rows = body.into_iter().map(|(_, row)| row).collect();
    Ok(TableLiteral::from_parts_unchecked(header, rows))
}

fn cells(row: Pair<Rule>) -> Vec<String> {
    row.into_inner()
        .filter(|p| p.as_rule() == Rule::cell)
        .map(|p| p.as_str().to_string())
        .collect()
}

// ── Declarations ──────────────────────────────────────────

fn build_column(pair: Pair<Rule>) -> Result<ColumnDecl, LiteralError> {
    let (line, column) = pair.as_span().start_pos().line_col();
    let mut parts = pair.into_inner();

    let name = parts.next()
        .ok_or_else(|| unexpected(line, column, "missing column name"))?
        .as_str().to_string();

    let type_pair = parts.next()
        .ok_or_else(|| unexpected(line, column, "missing column type"))?;
    let col_type = ColumnType::from_sql(type_pair.as_str())
        .ok_or_else(|| unexpected(line, column, &format!("unknown type {}", type_pair.as_str())))?;

    let references = match parts.next() {
        Some(fk) => {
            let mut idents = fk.into_inner();
            let table = idents.next()
                .ok_or_else(|| unexpected(line, column, "REFERENCES missing table"))?
                .as_str().to_string();
            let target = idents.next()
                .ok_or_else(|| unexpected(line, column, "REFERENCES missing column"))?
                .as_str().to_string();
            Some(ForeignKey { table, column: target })
        }
        None => None,
    };

    Ok(ColumnDecl { name, col_type, references })
}

fn unexpected(line: usize, column: usize, message: &str) -> LiteralError {
    LiteralError::Grammar { line, column, message: message.to_string() }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
