//! Rendering a [`TableLiteral`] back into bordered form.

use std::fmt;

use crate::ast::TableLiteral;

impl fmt::Display for TableLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self
            .header()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.rows()
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .fold(name.chars().count(), usize::max)
            })
            .collect();

        let border = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");

        writeln!(f, "+{border}+")?;
        write_row(f, self.header(), &widths)?;
        writeln!(f, "+{border}+")?;
        for row in self.rows() {
            write_row(f, row, &widths)?;
        }
        write!(f, "+{border}+")
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    for (cell, &width) in cells.iter().zip(widths) {
        write!(f, "| {cell:<width$} ")?;
    }
    writeln!(f, "|")
}

/// Render a table literal; same as its `Display` output.
pub fn render(table: &TableLiteral) -> String {
    table.to_string()
}
