//! Foreign-key safe insertion order.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use crate::error::SchemaError;
use crate::schema::Schema;

/// Named tables with `from -> to` edges meaning "`from` references `to`".
///
/// Nodes keep the order they were first added in; [`order`](Self::order)
/// uses it to break ties, so the same graph always yields the same order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    deps:  Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node unless it is already present. Returns its position.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.deps.push(BTreeSet::new());
        i
    }

    /// Records that `from` depends on `to`, adding either node if needed.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        self.deps[from].insert(to);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Kahn's algorithm: every node comes after all nodes it depends on.
    /// Among nodes that are ready at the same time, the one added first wins.
    ///
    /// Fails with [`SchemaError::DependencyCycle`] naming every node that
    /// could not be placed, including nodes that depend on themselves.
    pub fn order(&self) -> Result<Vec<String>, SchemaError> {
        let n = self.names.len();
        let mut pending: Vec<usize> = self.deps.iter().map(BTreeSet::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (node, deps) in self.deps.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut out = Vec::with_capacity(n);
        while let Some(node) = ready.pop_first() {
            out.push(node);
            for &dependent in &dependents[node] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if out.len() < n {
            let tables = (0..n)
                .filter(|&i| pending[i] > 0)
                .map(|i| self.names[i].clone())
                .collect();
            return Err(SchemaError::DependencyCycle { tables });
        }

        Ok(out.into_iter().map(|i| self.names[i].clone()).collect())
    }
}

/// Orders `schemas` so every referenced table precedes the tables
/// referencing it.
///
/// Tables referenced by an input schema but missing from `schemas` are
/// pulled in as well. Ties keep input order.
pub fn order(schemas: &[Arc<Schema>]) -> Result<Vec<Arc<Schema>>, SchemaError> {
    let mut graph = DependencyGraph::new();
    let mut by_name: HashMap<String, Arc<Schema>> = HashMap::new();
    for schema in schemas {
        graph.add_node(&schema.name);
        by_name.insert(schema.name.clone(), Arc::clone(schema));
    }

    let mut queue: VecDeque<Arc<Schema>> = schemas.iter().cloned().collect();
    while let Some(schema) = queue.pop_front() {
        for reference in schema.references() {
            let target = reference.table();
            if !by_name.contains_key(&target.name) {
                by_name.insert(target.name.clone(), Arc::clone(target));
                queue.push_back(Arc::clone(target));
            }
            graph.add_edge(&schema.name, &target.name);
        }
    }

    Ok(graph
        .order()?
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType, Reference};
    use proptest::prelude::*;

    fn names(schemas: &[Arc<Schema>]) -> Vec<&str> {
        schemas.iter().map(|s| s.name.as_str()).collect()
    }

    fn shop() -> (Arc<Schema>, Arc<Schema>, Arc<Schema>) {
        let country = Arc::new(Schema::new("Country", vec![
            Column::new("code", ColumnType::Text),
            Column::new("name", ColumnType::Text),
        ]));
        let user = Arc::new(Schema::new("User", vec![
            Column::new("name", ColumnType::Text),
            Column::new("country", ColumnType::Text)
                .referencing(Reference::new(Arc::clone(&country), "code").unwrap()),
        ]));
        let order = Arc::new(Schema::new("Order", vec![
            Column::new("id", ColumnType::Int),
            Column::new("user", ColumnType::Text)
                .referencing(Reference::new(Arc::clone(&user), "name").unwrap()),
        ]));
        (country, user, order)
    }

    #[test]
    fn referenced_tables_come_first() {
        let (c, u, o) = shop();
        let ordered = order(&[o, u, c]).unwrap();
        assert_eq!(names(&ordered), vec!["Country", "User", "Order"]);
    }

    #[test]
    fn missing_dependencies_are_pulled_in() {
        let (_, _, o) = shop();
        let ordered = order(&[o]).unwrap();
        assert_eq!(names(&ordered), vec!["Country", "User", "Order"]);
    }

    #[test]
    fn independent_tables_keep_input_order() {
        let a = Arc::new(Schema::new("a", vec![Column::new("x", ColumnType::Int)]));
        let b = Arc::new(Schema::new("b", vec![Column::new("x", ColumnType::Int)]));
        assert_eq!(names(&order(&[a.clone(), b.clone()]).unwrap()), vec!["a", "b"]);
        assert_eq!(names(&order(&[b, a]).unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn order_is_repeatable() {
        let (c, u, o) = shop();
        let input = [u, o, c];
        let first = order(&input).unwrap();
        for _ in 0..10 {
            assert_eq!(names(&order(&input).unwrap()), names(&first));
        }
    }

    #[test]
    fn graph_cycle_is_reported() {
        let mut g = DependencyGraph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("c", "a");
        g.add_node("free");
        let err = g.order().unwrap_err();
        let SchemaError::DependencyCycle { tables } = err else { panic!("expected cycle") };
        assert_eq!(tables, vec!["a", "b", "c"]);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge("node", "node");
        assert!(matches!(g.order(), Err(SchemaError::DependencyCycle { .. })));
    }

    #[test]
    fn duplicate_edges_count_once() {
        let mut g = DependencyGraph::new();
        g.add_edge("b", "a");
        g.add_edge("b", "a");
        assert_eq!(g.order().unwrap(), vec!["a", "b"]);
        assert_eq!(g.len(), 2);
    }

    proptest! {
        /// Edges only point from higher to lower indices, so the graph is acyclic.
        #[test]
        fn acyclic_graphs_respect_every_edge(
            n in 1usize..12,
            raw in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
        ) {
            let mut g = DependencyGraph::new();
            for i in (0..n).rev() {
                g.add_node(&format!("t{i}"));
            }
            let edges: Vec<(usize, usize)> = raw
                .into_iter()
                .map(|(a, b)| (a % n, b % n))
                .filter(|(a, b)| a > b)
                .collect();
            for (a, b) in &edges {
                g.add_edge(&format!("t{a}"), &format!("t{b}"));
            }

            let ordered = g.order().unwrap();
            prop_assert_eq!(ordered.len(), n);
            let pos = |name: String| ordered.iter().position(|o| *o == name).unwrap();
            for (a, b) in edges {
                let (target, source) = (pos(format!("t{}", b)), pos(format!("t{}", a)));
                prop_assert!(target < source);
            }
        }

        #[test]
        fn closing_a_chain_creates_a_cycle(n in 2usize..10) {
            let mut g = DependencyGraph::new();
            for i in 1..n {
                g.add_edge(&format!("t{i}"), &format!("t{}", i - 1));
            }
            prop_assert!(g.order().is_ok());
            g.add_edge("t0", &format!("t{}", n - 1));
            let is_cycle = matches!(g.order(), Err(SchemaError::DependencyCycle { .. }));
            prop_assert!(is_cycle);
        }
    }
}
