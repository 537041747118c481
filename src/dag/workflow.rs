// src/dag/workflow.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;

use crate::dag::graph::DagGraph;
use crate::dag::task::Task;
use crate::engine::{RunResults, TaskReport};
use crate::errors::{Result, TaskflowError};
use crate::types::TaskName;

/// A graph definition: tasks plus their prerequisite edges.
///
/// Prerequisites are recorded by name when a task is added and only
/// resolved when the graph is built, so tasks may be added in any order.
/// A workflow can be run any number of times, but not concurrently: the
/// tasks' status fields are shared by every run.
#[derive(Debug)]
pub struct Workflow {
    name: String,
    tasks: Vec<Arc<Task>>,
    deps: Vec<BTreeSet<TaskName>>,
    index: HashMap<TaskName, usize>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            deps: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a task that runs after every task named in `depends_on`.
    ///
    /// Fails with [`TaskflowError::DuplicateTask`] if the name is taken.
    /// Unknown prerequisite names are accepted here and reported by
    /// [`Workflow::validate_references`].
    pub fn add_task<I, S>(&mut self, task: Task, depends_on: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        if self.index.contains_key(task.name()) {
            return Err(TaskflowError::DuplicateTask(task.name().to_string()));
        }

        self.index.insert(task.name().to_string(), self.tasks.len());
        self.deps
            .push(depends_on.into_iter().map(Into::into).collect());
        self.tasks.push(Arc::new(task));
        Ok(())
    }

    /// Add a task with no prerequisites.
    pub fn add_root(&mut self, task: Task) -> Result<()> {
        self.add_task(task, std::iter::empty::<TaskName>())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// Tasks in insertion order. Index `i` matches `TaskId` `i` of
    /// [`Workflow::graph`].
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    /// Declared prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<TaskName>> {
        self.index.get(name).map(|&i| &self.deps[i])
    }

    /// Build the indexed graph, validating every prerequisite reference.
    pub fn graph(&self) -> Result<DagGraph> {
        DagGraph::build(
            self.tasks
                .iter()
                .zip(self.deps.iter())
                .map(|(t, d)| (t.name(), d)),
        )
    }

    /// Fail with every `(task, missing prerequisite)` pair, if any.
    pub fn validate_references(&self) -> Result<()> {
        self.graph().map(|_| ())
    }

    /// A valid execution order of task names (Kahn's algorithm).
    ///
    /// Fails on unknown references, or with [`TaskflowError::DagCycle`]
    /// naming every task that could not be ordered.
    pub fn toposort(&self) -> Result<Vec<TaskName>> {
        let graph = self.graph()?;
        self.order_of(&graph)
    }

    pub(crate) fn order_of(&self, graph: &DagGraph) -> Result<Vec<TaskName>> {
        match graph.toposort() {
            Ok(order) => Ok(order
                .into_iter()
                .map(|id| graph.name(id).to_string())
                .collect()),
            Err(stuck) => Err(TaskflowError::DagCycle {
                workflow: self.name.clone(),
                stuck: stuck
                    .into_iter()
                    .map(|id| graph.name(id).to_string())
                    .collect(),
            }),
        }
    }

    /// Pre-flight check: `Ok(())` if the graph is complete and acyclic.
    pub fn validate_acyclic(&self) -> Result<()> {
        self.toposort().map(|_| ())
    }

    /// Per-task caller-facing summary, pairing each result with the task's
    /// current status.
    pub fn report(&self, results: &RunResults) -> BTreeMap<TaskName, TaskReport> {
        results
            .iter()
            .filter_map(|(name, result)| {
                let task = self.task(name)?;
                Some((name.clone(), TaskReport::new(task.status(), result)))
            })
            .collect()
    }

    /// Graphviz rendering of the declared graph (edges point from a
    /// prerequisite to its dependent). Unknown prerequisites show up as
    /// extra nodes.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraphMap<&str, &str> = DiGraphMap::new();

        for task in &self.tasks {
            graph.add_node(task.name());
        }
        for (task, deps) in self.tasks.iter().zip(self.deps.iter()) {
            for dep in deps {
                graph.add_edge(dep.as_str(), task.name(), "");
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
