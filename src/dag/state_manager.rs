// src/dag/state_manager.rs

//! Per-run bookkeeping for the wavefront scheduler.
//!
//! [`RunState`] is synchronous and deterministic: it never touches tokio or
//! the tasks themselves. The scheduler feeds it launches and completions and
//! acts on the [`SchedulerStep`]s it returns.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dag::graph::{DagGraph, TaskId};
use crate::dag::scheduler_step::SchedulerStep;
use crate::engine::{RunResults, TaskResult};

/// Skip reason for tasks downstream of a failed or skipped prerequisite.
pub const SKIP_PREREQUISITE_FAILED: &str = "SKIPPED: prerequisite failed";

/// Skip reason used by the post-loop sweep for tasks that never became ready.
pub const SKIP_UNRUNNABLE: &str = "SKIPPED: unrunnable after failure or unresolved deps";

/// Mutable state of one run, indexed by [`TaskId`].
#[derive(Debug)]
pub struct RunState<'g> {
    graph: &'g DagGraph,
    /// Number of prerequisites that have not resolved yet.
    remaining: Vec<usize>,
    /// Set once any ancestor resolved with `ok == false`.
    failed_ancestor: Vec<bool>,
    running: Vec<bool>,
    queued: Vec<bool>,
    ready: Vec<TaskId>,
    results: Vec<Option<TaskResult>>,
}

impl<'g> RunState<'g> {
    /// Fresh state with every root task queued as ready.
    pub fn new(graph: &'g DagGraph) -> Self {
        let n = graph.len();
        let remaining: Vec<usize> = graph
            .ids()
            .map(|id| graph.dependencies_of(id).len())
            .collect();
        let ready = graph.roots();
        let mut queued = vec![false; n];
        for &id in &ready {
            queued[id] = true;
        }

        Self {
            graph,
            remaining,
            failed_ancestor: vec![false; n],
            running: vec![false; n],
            queued,
            ready,
            results: vec![None; n],
        }
    }

    pub fn graph(&self) -> &'g DagGraph {
        self.graph
    }

    /// Drain the ready set, in the order tasks became ready.
    pub fn take_ready(&mut self) -> Vec<TaskId> {
        let ready = std::mem::take(&mut self.ready);
        for &id in &ready {
            self.queued[id] = false;
        }
        ready
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn has_failed_ancestor(&self, id: TaskId) -> bool {
        self.failed_ancestor[id]
    }

    pub fn is_resolved(&self, id: TaskId) -> bool {
        self.results[id].is_some()
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.running[id]
    }

    pub fn result(&self, id: TaskId) -> Option<&TaskResult> {
        self.results[id].as_ref()
    }

    pub fn mark_running(&mut self, id: TaskId) {
        self.running[id] = true;
    }

    /// Record the terminal result of a launched task and update its
    /// dependents: newly unblocked children are either queued as ready or,
    /// if any ancestor failed, skipped on the spot.
    pub fn complete(&mut self, id: TaskId, result: TaskResult) -> SchedulerStep {
        let graph = self.graph;
        self.running[id] = false;

        if self.results[id].is_some() {
            warn!(
                task = graph.name(id),
                "completion for already-resolved task; ignoring"
            );
            return SchedulerStep::default();
        }

        let ok = result.ok();
        self.results[id] = Some(result);

        let mut step = SchedulerStep::default();

        for &child in graph.dependents_of(id) {
            self.remaining[child] = self.remaining[child].saturating_sub(1);
            if !ok {
                self.failed_ancestor[child] = true;
            }

            if self.remaining[child] > 0 {
                continue;
            }

            if self.failed_ancestor[child] {
                let mut skipped = self.skip(child, SKIP_PREREQUISITE_FAILED);
                step.newly_skipped.append(&mut skipped);
            } else if self.results[child].is_none()
                && !self.running[child]
                && !self.queued[child]
            {
                debug!(task = graph.name(child), "all prerequisites resolved");
                self.queued[child] = true;
                self.ready.push(child);
                step.newly_ready.push(child);
            }
        }

        step
    }

    /// Resolve `id` as skipped and cascade through its descendants.
    ///
    /// Idempotent: a task that already has a result is left untouched.
    /// Every child of a skipped task is flagged as having a failed ancestor
    /// and loses one outstanding prerequisite; children left with none are
    /// skipped in the same pass, with the same reason.
    ///
    /// Returns the tasks newly skipped by this call.
    pub fn skip(&mut self, id: TaskId, reason: &str) -> Vec<TaskId> {
        let graph = self.graph;
        let mut newly_skipped = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if self.results[current].is_some() {
                continue;
            }

            self.results[current] = Some(TaskResult::skipped(reason));
            newly_skipped.push(current);

            for &child in graph.dependents_of(current) {
                self.failed_ancestor[child] = true;
                self.remaining[child] = self.remaining[child].saturating_sub(1);
                if self.remaining[child] == 0 {
                    stack.push(child);
                }
            }
        }

        newly_skipped
    }

    /// Tasks that still have no result.
    pub fn unresolved(&self) -> Vec<TaskId> {
        self.graph
            .ids()
            .filter(|&id| self.results[id].is_none())
            .collect()
    }

    /// Consume the state, keying every stored result by task name.
    pub fn into_results(self) -> RunResults {
        let graph = self.graph;
        self.results
            .into_iter()
            .enumerate()
            .filter_map(|(id, res)| res.map(|r| (graph.name(id).to_string(), r)))
            .collect::<BTreeMap<_, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::Utc;
    use serde_json::json;

    use crate::types::TaskName;

    fn graph(spec: &[(&str, &[&str])]) -> DagGraph {
        let deps: Vec<(String, BTreeSet<TaskName>)> = spec
            .iter()
            .map(|(n, d)| (n.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect();
        DagGraph::build(deps.iter().map(|(n, d)| (n.as_str(), d))).unwrap()
    }

    fn diamond() -> DagGraph {
        graph(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])])
    }

    fn ok() -> TaskResult {
        TaskResult::succeeded(json!(null), 0, Utc::now())
    }

    fn failed() -> TaskResult {
        TaskResult::failed("boom".into(), 1, Utc::now())
    }

    #[test]
    fn roots_are_ready_first() {
        let g = diamond();
        let mut state = RunState::new(&g);

        assert_eq!(state.take_ready(), vec![0]);
        assert!(!state.has_ready());
    }

    #[test]
    fn join_waits_for_every_prerequisite() {
        let g = diamond();
        let mut state = RunState::new(&g);
        state.take_ready();

        state.mark_running(0);
        let step = state.complete(0, ok());
        assert_eq!(step.newly_ready, vec![1, 2]);

        state.take_ready();
        let step = state.complete(1, ok());
        assert!(step.is_empty(), "D must wait for C");

        let step = state.complete(2, ok());
        assert_eq!(step.newly_ready, vec![3]);
    }

    #[test]
    fn failure_skips_join_once_other_branch_resolves() {
        let g = diamond();
        let mut state = RunState::new(&g);
        state.take_ready();
        state.complete(0, ok());
        state.take_ready();

        let step = state.complete(1, failed());
        assert!(step.is_empty());
        assert!(state.has_failed_ancestor(3));
        assert!(!state.is_resolved(3));

        let step = state.complete(2, ok());
        assert_eq!(step.newly_skipped, vec![3]);
        assert!(step.newly_ready.is_empty());
        assert_eq!(
            state.result(3).and_then(|r| r.error()),
            Some(SKIP_PREREQUISITE_FAILED)
        );
    }

    #[test]
    fn skip_cascades_through_chain_in_one_pass() {
        let g = graph(&[("A", &[]), ("B", &["A"]), ("C", &["B"]), ("D", &["C"])]);
        let mut state = RunState::new(&g);
        state.take_ready();

        let step = state.complete(0, failed());

        assert_eq!(step.newly_skipped, vec![1, 2, 3]);
        assert!(state.unresolved().is_empty());
    }

    #[test]
    fn skip_is_idempotent() {
        let g = diamond();
        let mut state = RunState::new(&g);
        state.take_ready();
        state.complete(0, ok());

        let before = state.result(0).cloned();
        assert!(state.skip(0, "ignored").is_empty());
        assert_eq!(state.result(0).cloned(), before);

        assert_eq!(state.skip(1, "first"), vec![1]);
        assert!(state.skip(1, "second").is_empty());
        assert_eq!(state.result(1).and_then(|r| r.error()), Some("first"));
    }

    #[test]
    fn cycle_members_stay_unresolved_until_swept() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("C", &["A"])]);
        let mut state = RunState::new(&g);

        assert!(state.take_ready().is_empty());
        assert_eq!(state.unresolved(), vec![0, 1, 2]);

        for id in state.unresolved() {
            state.skip(id, SKIP_UNRUNNABLE);
        }

        let results = state.into_results();
        assert_eq!(results.len(), 3);
        assert!(results.values().all(|r| r.error() == Some(SKIP_UNRUNNABLE)));
    }
}
