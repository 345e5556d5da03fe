use std::collections::BTreeMap;

use serde_json::Value;

/// How a single GIVEN cell is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    /// Written into the table as is, after coercion to the column type.
    Literal(&'a str),
    /// A `marker`-prefixed token; holds the name without the marker.
    Placeholder(&'a str),
}

impl<'a> Cell<'a> {
    /// A cell is a placeholder when it starts with `marker` and has at least
    /// one character after it. A lone marker is an ordinary literal.
    pub fn classify(text: &'a str, marker: char) -> Self {
        match text.strip_prefix(marker) {
            Some(name) if !name.is_empty() => Cell::Placeholder(name),
            _ => Cell::Literal(text),
        }
    }
}

/// Values chosen for placeholder tokens during one fixture resolution.
///
/// Every occurrence of a token, in any GIVEN table, resolves to the same
/// value. Lookups accept the name with or without the marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholders {
    marker: char,
    values: BTreeMap<String, Value>,
}

impl Placeholders {
    pub fn new(marker: char) -> Self {
        Self { marker, values: BTreeMap::new() }
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// Value bound to `name` (`"c"` and `":c"` are the same token).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(self.strip(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(self.strip(name))
    }

    /// Binds `name` to `value`, returning the previous binding.
    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        let name = self.strip(name).to_string();
        self.values.insert(name, value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bindings sorted by name, without the marker.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn strip<'n>(&self, name: &'n str) -> &'n str {
        name.strip_prefix(self.marker).unwrap_or(name)
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::new(':')
    }
}
