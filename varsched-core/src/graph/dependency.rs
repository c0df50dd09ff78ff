//! Graph construction and queries.
//!
//! # Algorithm
//!
//! 1. Register every variable name as a node, in declaration order.
//! 2. Extract each template's references to *other* known names and record
//!    an edge dependency -> dependent.
//! 3. Run Kahn's algorithm. If some nodes are never released, they sit on
//!    or behind a cycle; walk unreleased dependencies from the first of them
//!    until a name repeats to report the cycle.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::node::{Node, NodeId};
use crate::config::UnknownReferencePolicy;
use crate::error::{Result, SchedulerError};
use crate::template::{extract_dependencies, unknown_references};

/// Dependency graph over the variables of one set.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes keyed by variable name. The map position is the node's id.
    nodes: IndexMap<String, Node>,

    /// Node ids with every dependency before its dependents.
    topological_order: Vec<NodeId>,
}

impl DependencyGraph {
    /// Build the graph from `(name, template)` pairs given in declaration
    /// order.
    pub fn build<'a, I>(variables: I, unknown: UnknownReferencePolicy) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let variables: Vec<(&str, &str)> = variables.into_iter().collect();

        let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(variables.len());
        for (name, _) in &variables {
            if nodes.insert(name.to_string(), Node::new()).is_some() {
                return Err(SchedulerError::DuplicateVariable(name.to_string()));
            }
        }

        for (index, (name, template)) in variables.iter().enumerate() {
            let is_other = |candidate: &str| candidate != *name && nodes.contains_key(candidate);
            let dependencies: Vec<NodeId> = extract_dependencies(template, is_other)
                .into_iter()
                .filter_map(|dep| nodes.get_index_of(dep).map(NodeId::from))
                .collect();

            if unknown == UnknownReferencePolicy::Warn {
                for reference in unknown_references(template, |n| nodes.contains_key(n)) {
                    warn!(variable = %name, reference = %reference, "template references unknown variable");
                }
            }

            let dependent = NodeId::from(index);
            for dependency in dependencies {
                nodes[index].add_dependency(dependency);
                nodes[dependency.index()].add_dependent(dependent);
            }
        }

        let mut graph = Self {
            nodes,
            topological_order: Vec::new(),
        };
        graph.topological_order = graph.topological_sort()?;

        debug!(
            variables = graph.len(),
            edges = graph.edge_count(),
            "built variable dependency graph"
        );
        Ok(graph)
    }

    /// Kahn's algorithm over the whole graph, seeded in declaration order.
    fn topological_sort(&self) -> Result<Vec<NodeId>> {
        let mut in_degree: Vec<usize> = self
            .nodes
            .values()
            .map(|node| node.dependencies().len())
            .collect();

        let mut queue: VecDeque<NodeId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| NodeId::from(index))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop_front() {
            order.push(node_id);
            for &dependent in self.node(node_id).dependents() {
                let degree = &mut in_degree[dependent.index()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() == self.nodes.len() {
            return Ok(order);
        }

        let cycle = self.find_cycle(&in_degree);
        warn!(cycle = %cycle.join(" -> "), "variable dependency cycle");
        Err(SchedulerError::CycleDetected { cycle })
    }

    /// Follow unreleased dependencies until a node repeats.
    ///
    /// Every node with a non-zero remaining in-degree has at least one
    /// dependency that is also unreleased, so the walk cannot dead-end.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<String> {
        let Some(start) = in_degree.iter().position(|degree| *degree > 0) else {
            return Vec::new();
        };

        let mut path: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut current = NodeId::from(start);

        while seen.insert(current) {
            path.push(current);
            match self
                .node(current)
                .dependencies()
                .iter()
                .find(|dep| in_degree[dep.index()] > 0)
            {
                Some(&next) => current = next,
                None => break,
            }
        }

        let first = path.iter().position(|id| *id == current).unwrap_or(0);
        let mut cycle: Vec<String> = path[first..]
            .iter()
            .map(|id| self.name(*id).to_string())
            .collect();
        cycle.push(self.name(current).to_string());
        cycle
    }

    fn node(&self, node_id: NodeId) -> &Node {
        &self.nodes[node_id.index()]
    }

    fn name(&self, node_id: NodeId) -> &str {
        self.nodes
            .get_index(node_id.index())
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    fn names<'g>(&'g self, ids: &'g [NodeId]) -> impl Iterator<Item = &'g str> + 'g {
        ids.iter().map(move |id| self.name(*id))
    }

    /// Direct dependencies of `name`, in declaration order.
    ///
    /// Unknown names have none.
    pub fn dependencies_of<'g>(&'g self, name: &str) -> impl Iterator<Item = &'g str> + 'g {
        let ids = self
            .nodes
            .get(name)
            .map(|node| node.dependencies())
            .unwrap_or_default();
        self.names(ids)
    }

    /// Direct dependents of `name`, in declaration order.
    pub fn dependents_of<'g>(&'g self, name: &str) -> impl Iterator<Item = &'g str> + 'g {
        let ids = self
            .nodes
            .get(name)
            .map(|node| node.dependents())
            .unwrap_or_default();
        self.names(ids)
    }

    /// Whether `name` has no dependencies at all.
    pub fn is_root(&self, name: &str) -> bool {
        self.nodes.get(name).map_or(true, Node::is_root)
    }

    /// True iff every direct dependency of `name` is in `resolved`.
    pub fn is_ready(&self, name: &str, resolved: &HashSet<&str>) -> bool {
        self.is_ready_with(name, |dep| resolved.contains(dep))
    }

    /// Same as [`DependencyGraph::is_ready`] with a predicate instead of a set.
    pub fn is_ready_with<F>(&self, name: &str, is_resolved: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.dependencies_of(name).all(is_resolved)
    }

    /// Variable names with dependencies before dependents. Ties keep
    /// declaration order.
    pub fn topological_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.names(&self.topological_order)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of variables in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.dependencies().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(variables: &[(&str, &str)]) -> Result<DependencyGraph> {
        DependencyGraph::build(variables.iter().copied(), UnknownReferencePolicy::Ignore)
    }

    #[test]
    fn edges_follow_references() {
        let graph = build(&[("a", "q"), ("b", "q $a"), ("c", "q ${a} ${b}")]).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.dependencies_of("a").next().is_none());
        assert_eq!(graph.dependencies_of("c").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(graph.dependents_of("a").collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(graph.is_root("a"));
        assert!(!graph.is_root("b"));
    }

    #[test]
    fn neighbor_queries_use_declaration_order() {
        // `late` is declared before `early` but references are written the
        // other way round.
        let graph = build(&[("src", "x"), ("late", "$src"), ("early", "$src")]).unwrap();
        assert_eq!(
            graph.dependents_of("src").collect::<Vec<_>>(),
            vec!["late", "early"]
        );
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let graph = build(&[("c", "$b"), ("b", "$a"), ("a", "root")]).unwrap();
        assert_eq!(graph.topological_order().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn cycle_is_reported() {
        let err = build(&[("a", "$c"), ("b", "$a"), ("c", "$b"), ("d", "x")]).unwrap_err();
        match err {
            SchedulerError::CycleDetected { cycle } => {
                assert_eq!(cycle, vec!["a", "c", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn node_behind_a_cycle_reports_the_cycle_only() {
        // `tail` depends on the cycle but is not part of it.
        let err = build(&[("tail", "$x"), ("x", "$y"), ("y", "$x")]).unwrap_err();
        match err {
            SchedulerError::CycleDetected { cycle } => assert_eq!(cycle, vec!["x", "y", "x"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_not_an_edge() {
        let graph = build(&[("a", "values($a)")]).unwrap();
        assert!(graph.is_root("a"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = build(&[("a", "x"), ("a", "y")]).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateVariable(name) if name == "a"));
    }

    #[test]
    fn readiness_needs_every_dependency() {
        let graph = build(&[("a", "x"), ("b", "y"), ("c", "$a $b")]).unwrap();

        let mut resolved: HashSet<&str> = HashSet::new();
        assert!(graph.is_ready("a", &resolved));
        assert!(!graph.is_ready("c", &resolved));

        resolved.insert("a");
        assert!(!graph.is_ready("c", &resolved));

        resolved.insert("b");
        assert!(graph.is_ready("c", &resolved));
    }

    /// Build under `policy` and return whatever was logged at WARN or above.
    fn build_logged(
        variables: &[(&str, &str)],
        policy: UnknownReferencePolicy,
    ) -> (Result<DependencyGraph>, String) {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let graph = tracing::subscriber::with_default(subscriber, || {
            DependencyGraph::build(variables.iter().copied(), policy)
        });
        let logged = String::from_utf8_lossy(&captured.0.lock().unwrap()).into_owned();
        (graph, logged)
    }

    #[test]
    fn warn_policy_logs_unknown_references_without_edges() {
        let variables = [("a", "q ${missing}"), ("b", "q $a $other")];
        let (graph, logged) = build_logged(&variables, UnknownReferencePolicy::Warn);
        let graph = graph.unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.is_root("a"));
        assert_eq!(graph.dependencies_of("b").collect::<Vec<_>>(), vec!["a"]);
        assert!(logged.contains("template references unknown variable"));
        assert!(logged.contains("reference=missing"));
        assert!(logged.contains("reference=other"));
    }

    #[test]
    fn ignore_policy_stays_quiet() {
        let (graph, logged) =
            build_logged(&[("a", "q ${missing}")], UnknownReferencePolicy::Ignore);
        assert_eq!(graph.unwrap().edge_count(), 0);
        assert!(logged.is_empty());
    }
}
