// src/tasks/graph.rs

use std::collections::{BTreeSet, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{PipewrightError, Result};
use crate::tasks::TaskName;

/// Dependency graph of the named tasks.
///
/// Edge direction: dependency -> task. `package` runs after `lint` and
/// `test`, so there are edges `lint -> package` and `test -> package`.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraphMap<TaskName, ()>,
}

impl TaskGraph {
    pub fn new(edges: &[(TaskName, TaskName)]) -> Result<Self> {
        let mut graph = DiGraphMap::new();
        for task in TaskName::ALL {
            graph.add_node(task);
        }
        for (dep, task) in edges {
            graph.add_edge(*dep, *task, ());
        }
        // A topological sort will fail if there is a cycle.
        if let Err(cycle) = toposort(&graph, None) {
            return Err(PipewrightError::ConfigError(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            )));
        }
        Ok(Self { graph })
    }

    /// The built-in task table.
    pub fn standard() -> Self {
        Self {
            graph: DiGraphMap::from_edges(STANDARD_EDGES.iter().copied()),
        }
        .with_all_nodes()
    }

    fn with_all_nodes(mut self) -> Self {
        for task in TaskName::ALL {
            self.graph.add_node(task);
        }
        self
    }

    /// Direct dependencies of `task`, in declaration order.
    pub fn dependencies_of(&self, task: TaskName) -> Vec<TaskName> {
        let mut deps: Vec<TaskName> = self
            .graph
            .neighbors_directed(task, Direction::Incoming)
            .collect();
        deps.sort();
        deps
    }

    /// `task` and all its transitive dependencies, dependencies first.
    ///
    /// Among tasks that are ready at the same time, the one declared first
    /// in [`TaskName`] runs first, so the order is stable.
    pub fn execution_order(&self, task: TaskName) -> Vec<TaskName> {
        let mut needed = HashSet::new();
        let mut stack = vec![task];
        while let Some(t) = stack.pop() {
            if needed.insert(t) {
                stack.extend(self.graph.neighbors_directed(t, Direction::Incoming));
            }
        }

        let mut done: HashSet<TaskName> = HashSet::new();
        let mut order = Vec::with_capacity(needed.len());
        let mut ready: BTreeSet<TaskName> = needed
            .iter()
            .copied()
            .filter(|t| self.dependencies_of(*t).is_empty())
            .collect();

        while let Some(next) = ready.pop_first() {
            done.insert(next);
            order.push(next);
            for dependent in self.graph.neighbors_directed(next, Direction::Outgoing) {
                if needed.contains(&dependent)
                    && !done.contains(&dependent)
                    && self
                        .dependencies_of(dependent)
                        .iter()
                        .all(|d| done.contains(d))
                {
                    ready.insert(dependent);
                }
            }
        }
        order
    }
}

/// `(dependency, task)` pairs of the built-in tasks.
const STANDARD_EDGES: &[(TaskName, TaskName, ())] = &[
    (TaskName::Prepare, TaskName::Lint, ()),
    (TaskName::Prepare, TaskName::Test, ()),
    (TaskName::Lint, TaskName::Package, ()),
    (TaskName::Test, TaskName::Package, ()),
    (TaskName::Package, TaskName::Distribution, ()),
    (TaskName::Package, TaskName::Default, ()),
];
