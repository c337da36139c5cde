//! Dependency resolution and execution ordering.
//!
//! The resolver builds a directed graph over every catalog entry (edges
//! point from dependency to dependent), computes a deterministic
//! topological order, and filters it down to the transitive closure of the
//! requested package. The result is an execution plan where every
//! dependency appears strictly before everything that needs it.
//!
//! Determinism matters here: when several packages become ready at the same
//! time, they are emitted in lexicographic name order, so plans are
//! reproducible across runs and in tests.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::catalog::Catalog;
use crate::core::{Result, UnipakError};

/// Dependency graph over the whole catalog.
///
/// Built fresh per resolve call; the graph is cheap to construct and the
/// catalog is immutable, so nothing is cached between operations.
pub struct DependencyResolver {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyResolver {
    /// Build the graph from every package, custom package, and GitHub
    /// release package in the catalog.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut resolver = Self { graph: DiGraph::new(), node_map: HashMap::new() };
        for (name, deps) in catalog.dependency_nodes() {
            let dependent = resolver.ensure_node(&name);
            for dep in deps {
                let dependency = resolver.ensure_node(&dep);
                // Edge points dependency -> dependent, so in-degree counts
                // remaining unmet dependencies.
                if !resolver.graph.contains_edge(dependency, dependent) {
                    resolver.graph.add_edge(dependency, dependent, ());
                }
            }
        }
        resolver
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Compute the execution plan for `name`: the package and everything it
    /// transitively depends on, dependencies first.
    ///
    /// # Errors
    ///
    /// [`UnipakError::PackageNotFound`] when `name` is not in the catalog;
    /// [`UnipakError::DependencyCycle`] when the graph cannot be fully
    /// ordered.
    pub fn resolve(&self, name: &str) -> Result<Vec<String>> {
        if !self.node_map.contains_key(name) {
            return Err(UnipakError::PackageNotFound { name: name.to_string() });
        }
        let order = self.topological_order()?;
        let closure = self.closure(name);
        Ok(order.into_iter().filter(|n| closure.contains(n)).collect())
    }

    /// Deterministic Kahn ordering over the whole graph.
    ///
    /// Zero-in-degree candidates are drawn from a min-heap keyed by name,
    /// so ties always break lexicographically.
    fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(String, NodeIndex)>> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&idx, _)| Reverse((self.graph[idx].clone(), idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((name, idx))) = ready.pop() {
            order.push(name);
            for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                let degree = in_degree
                    .get_mut(&dependent)
                    .expect("dependent node missing from in-degree map");
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse((self.graph[dependent].clone(), dependent)));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let mut members: Vec<&str> = in_degree
                .iter()
                .filter(|&(_, &deg)| deg > 0)
                .map(|(&idx, _)| self.graph[idx].as_str())
                .collect();
            members.sort_unstable();
            return Err(UnipakError::DependencyCycle { members: members.join(", ") });
        }
        Ok(order)
    }

    /// Transitive dependency closure of `name`, including `name` itself.
    fn closure(&self, name: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut stack = vec![self.node_map[name]];
        while let Some(idx) = stack.pop() {
            if !visited.insert(self.graph[idx].clone()) {
                continue;
            }
            // Dependencies are the edges pointing into this node.
            stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CustomPackage, Package, Source};

    fn catalog(entries: &[(&str, &[&str])]) -> Catalog {
        let mut catalog = Catalog {
            custom_packages: entries
                .iter()
                .map(|(name, deps)| CustomPackage {
                    name: (*name).to_string(),
                    depends_on: deps.iter().map(|d| (*d).to_string()).collect(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        catalog.build_indexes();
        catalog
    }

    fn position(plan: &[String], name: &str) -> usize {
        plan.iter().position(|n| n == name).unwrap_or_else(|| panic!("{name} not in plan"))
    }

    #[test]
    fn chain_orders_dependencies_first() {
        let catalog = catalog(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        let plan = resolver.resolve("a").unwrap();
        assert_eq!(plan, vec!["c", "b", "a"]);
    }

    #[test]
    fn diamond_respects_all_edges() {
        let catalog =
            catalog(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        let plan = resolver.resolve("a").unwrap();
        assert_eq!(plan.len(), 4);
        assert!(position(&plan, "d") < position(&plan, "b"));
        assert!(position(&plan, "d") < position(&plan, "c"));
        assert!(position(&plan, "b") < position(&plan, "a"));
        assert!(position(&plan, "c") < position(&plan, "a"));
    }

    #[test]
    fn ties_break_lexicographically() {
        // b and c both become ready once d is emitted.
        let catalog =
            catalog(&[("a", &["c", "b"]), ("c", &["d"]), ("b", &["d"]), ("d", &[])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        let plan = resolver.resolve("a").unwrap();
        assert_eq!(plan, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn plan_is_filtered_to_the_closure() {
        let catalog = catalog(&[("a", &["b"]), ("b", &[]), ("unrelated", &[])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        let plan = resolver.resolve("a").unwrap();
        assert_eq!(plan, vec!["b", "a"]);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let catalog = catalog(&[("a", &[])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        assert!(matches!(
            resolver.resolve("ghost"),
            Err(UnipakError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn cycle_is_detected() {
        let catalog = catalog(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        let err = resolver.resolve("a").unwrap_err();
        match err {
            UnipakError::DependencyCycle { members } => {
                assert_eq!(members, "a, b, c");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let catalog = catalog(&[("a", &["a"])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        assert!(matches!(
            resolver.resolve("a"),
            Err(UnipakError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn resolver_spans_all_catalog_kinds() {
        let mut catalog = Catalog {
            sources: vec![Source { name: "apt".into(), ..Default::default() }],
            packages: vec![Package {
                name: "git".into(),
                source: "apt".into(),
                depends_on: vec!["bootstrap".into()],
            }],
            custom_packages: vec![CustomPackage {
                name: "bootstrap".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        catalog.build_indexes();

        let resolver = DependencyResolver::from_catalog(&catalog);
        assert_eq!(resolver.resolve("git").unwrap(), vec!["bootstrap", "git"]);
    }

    #[test]
    fn duplicate_dependency_entries_collapse() {
        let catalog = catalog(&[("a", &["b", "b"]), ("b", &[])]);
        let resolver = DependencyResolver::from_catalog(&catalog);
        assert_eq!(resolver.resolve("a").unwrap(), vec!["b", "a"]);
    }
}
