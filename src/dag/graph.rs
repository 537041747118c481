// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::errors::{MissingDependency, Result, TaskflowError};
use crate::types::TaskName;

/// Stable integer handle for a task inside a [`DagGraph`].
///
/// Ids follow the order in which tasks were added to the workflow.
pub type TaskId = usize;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must resolve before this one can run.
    deps: Vec<TaskId>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskId>,
}

/// Arena of tasks addressed by [`TaskId`], with adjacency in both directions.
///
/// Building one validates that every declared prerequisite exists. It does
/// *not* check for cycles; call [`DagGraph::toposort`] for that.
#[derive(Debug, Clone)]
pub struct DagGraph {
    names: Vec<TaskName>,
    index: HashMap<TaskName, TaskId>,
    nodes: Vec<DagNode>,
}

impl DagGraph {
    /// Build the arena from `(name, prerequisites)` pairs in id order.
    ///
    /// Fails with [`TaskflowError::UnknownDependencies`] listing *every*
    /// dangling `(task, prerequisite)` pair, not just the first one.
    pub fn build<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a BTreeSet<TaskName>)>,
    {
        let entries: Vec<(&str, &BTreeSet<TaskName>)> = entries.into_iter().collect();

        let names: Vec<TaskName> = entries.iter().map(|(n, _)| n.to_string()).collect();
        let index: HashMap<TaskName, TaskId> = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id))
            .collect();

        let mut nodes = vec![DagNode::default(); names.len()];
        let mut missing = Vec::new();

        // First pass: resolve dependency names to ids.
        for (id, (name, prereqs)) in entries.iter().enumerate() {
            for prereq in prereqs.iter() {
                match index.get(prereq) {
                    Some(&dep_id) => nodes[id].deps.push(dep_id),
                    None => missing.push(MissingDependency {
                        task: name.to_string(),
                        prerequisite: prereq.clone(),
                    }),
                }
            }
        }

        if !missing.is_empty() {
            return Err(TaskflowError::UnknownDependencies(missing));
        }

        // Second pass: reverse edges.
        for id in 0..nodes.len() {
            let deps = nodes[id].deps.clone();
            for dep in deps {
                nodes[dep].dependents.push(id);
            }
        }

        Ok(Self {
            names,
            index,
            nodes,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All task ids, in insertion order.
    pub fn ids(&self) -> std::ops::Range<TaskId> {
        0..self.nodes.len()
    }

    pub fn name(&self, id: TaskId) -> &str {
        &self.names[id]
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.index.get(name).copied()
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id].deps
    }

    /// Immediate dependents of a task (tasks that list it as a prerequisite).
    pub fn dependents_of(&self, id: TaskId) -> &[TaskId] {
        &self.nodes[id].dependents
    }

    /// Tasks with no prerequisites.
    pub fn roots(&self) -> Vec<TaskId> {
        self.ids()
            .filter(|&id| self.nodes[id].deps.is_empty())
            .collect()
    }

    /// Kahn's algorithm.
    ///
    /// On success returns every id in a valid execution order. If a cycle
    /// prevents ordering all tasks, returns the ids whose in-degree never
    /// reached zero (the "stuck" set), in id order.
    pub fn toposort(&self) -> std::result::Result<Vec<TaskId>, Vec<TaskId>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.deps.len()).collect();
        let mut ready: VecDeque<TaskId> = self.ids().filter(|&id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(id) = ready.pop_front() {
            order.push(id);
            for &child in &self.nodes[id].dependents {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push_back(child);
                }
            }
        }

        if order.len() == self.len() {
            Ok(order)
        } else {
            Err(self.ids().filter(|&id| in_degree[id] > 0).collect())
        }
    }
}
