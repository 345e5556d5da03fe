//! Splitting test documentation into its GIVEN and WHEN sections.

use crate::error::LiteralError;

/// The two halves of a test's documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    /// `SELECT * FROM` headers and their table literals.
    pub given: String,
    /// Raw statements, one per line, in order.
    pub when:  Vec<String>,
}

/// Dedent and trim `doc`, then split it at the first blank line.
///
/// Lines holding only whitespace count as blank. Blank lines inside the
/// WHEN section are skipped.
pub fn split_sections(doc: &str) -> Result<Sections, LiteralError> {
    let text = dedent(doc);
    let lines: Vec<&str> = text.trim().lines().collect();

    let blank = lines
        .iter()
        .position(|l| l.trim().is_empty())
        .ok_or(LiteralError::MissingWhen)?;

    let when: Vec<String> = lines[blank + 1..]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if when.is_empty() {
        return Err(LiteralError::EmptyWhen);
    }

    Ok(Sections { given: lines[..blank].join("\n"), when })
}

/// Remove the leading whitespace common to every non-blank line.
/// Whitespace-only lines become empty.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start().len()])
        .fold(None, |acc: Option<&str>, indent| match acc {
            None    => Some(indent),
            Some(m) => Some(common_prefix(m, indent)),
        })
        .unwrap_or("");

    text.lines()
        .map(|l| if l.trim().is_empty() { "" } else { &l[margin.len()..] })
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_removes_common_margin() {
        assert_eq!(dedent("    a\n      b\n    c"), "a\n  b\nc");
    }

    #[test]
    fn dedent_ignores_blank_lines() {
        assert_eq!(dedent("    a\n\n  \n    b"), "a\n\n\nb");
    }

    #[test]
    fn dedent_mixed_tabs_and_spaces_keeps_only_shared_prefix() {
        assert_eq!(dedent("\t  a\n\t b"), " a\nb");
    }

    #[test]
    fn split_at_first_blank_line() {
        let s = split_sections("
            SELECT * FROM t;
            +---+---+
            | a | b |
            +---+---+
            | 1 | 2 |
            +---+---+

            SELECT * FROM t;
            SELECT count(*) FROM t;
        ").unwrap();
        assert!(s.given.starts_with("SELECT * FROM t;\n+---+---+"));
        assert!(s.given.ends_with("+---+---+"));
        assert_eq!(s.when, vec!["SELECT * FROM t;", "SELECT count(*) FROM t;"]);
    }

    #[test]
    fn whitespace_only_line_separates_sections() {
        let s = split_sections("given\n   \nwhen").unwrap();
        assert_eq!(s.given, "given");
        assert_eq!(s.when, vec!["when"]);
    }

    #[test]
    fn later_blank_lines_stay_in_when() {
        let s = split_sections("given\n\nfirst;\n\nsecond;").unwrap();
        assert_eq!(s.when, vec!["first;", "second;"]);
    }

    #[test]
    fn missing_blank_line_is_an_error() {
        assert_eq!(split_sections("SELECT * FROM t;\nSELECT 1;"), Err(LiteralError::MissingWhen));
    }
}
