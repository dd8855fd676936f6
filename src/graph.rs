//! Dependency graph construction and validation.
//!
//! Indexes a project's tasks and precedence links into adjacency lists and
//! a topological order. Detects:
//! - Duplicate task IDs (fatal)
//! - Tasks from another project (fatal)
//! - Circular dependencies (fatal, DAG validation)
//! - Dependencies with unknown endpoints or exact duplicates (dropped, warned)
//!
//! # Determinism
//! Kahn's algorithm releases ready tasks by `(sort_order, input index)`,
//! so rows carrying distinct sort orders produce the same order however
//! the caller arranged them.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{ScheduleError, Warning, WarningKind};
use crate::models::{Dependency, DependencyKind, Task};

/// One end of a precedence link, as seen from the other end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Index of the task at the other end.
    pub task: usize,
    pub kind: DependencyKind,
    pub lag_days: i64,
}

/// Validated precedence graph of one project.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    project_id: String,
    tasks: &'a [Task],
    index: HashMap<&'a str, usize>,
    order: Vec<usize>,
    predecessors: Vec<Vec<Edge>>,
    successors: Vec<Vec<Edge>>,
    warnings: Vec<Warning>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds and validates the graph.
    ///
    /// Invalid dependencies are dropped with a warning. Duplicate or foreign
    /// tasks and cycles fail the build.
    pub fn build(
        project_id: &str,
        tasks: &'a [Task],
        dependencies: &[Dependency],
    ) -> Result<Self, ScheduleError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if task.project_id != project_id {
                return Err(ScheduleError::ForeignTask {
                    task_id: task.id.clone(),
                    expected: project_id.to_string(),
                    actual: task.project_id.clone(),
                });
            }
            if index.insert(task.id.as_str(), i).is_some() {
                return Err(ScheduleError::DuplicateTask {
                    project_id: project_id.to_string(),
                    task_id: task.id.clone(),
                });
            }
        }

        let mut warnings = Vec::new();
        let mut predecessors = vec![Vec::new(); tasks.len()];
        let mut successors = vec![Vec::new(); tasks.len()];
        let mut seen = HashSet::new();

        for dep in dependencies {
            let label = format!(
                "{} -{}-> {}",
                dep.predecessor_id,
                dep.kind.code(),
                dep.successor_id
            );
            let (Some(&pred), Some(&succ)) = (
                index.get(dep.predecessor_id.as_str()),
                index.get(dep.successor_id.as_str()),
            ) else {
                warnings.push(Warning::new(
                    WarningKind::InvalidDependency,
                    label,
                    format!(
                        "Dependency references a task outside project '{project_id}'; ignored"
                    ),
                ));
                continue;
            };
            if !seen.insert((pred, succ, dep.kind)) {
                warnings.push(Warning::new(
                    WarningKind::InvalidDependency,
                    label,
                    "Duplicate dependency; ignored",
                ));
                continue;
            }
            predecessors[succ].push(Edge {
                task: pred,
                kind: dep.kind,
                lag_days: dep.lag_days,
            });
            successors[pred].push(Edge {
                task: succ,
                kind: dep.kind,
                lag_days: dep.lag_days,
            });
        }

        let order = topological_order(tasks, &predecessors, &successors);
        if order.len() < tasks.len() {
            let mut remaining = vec![true; tasks.len()];
            for &i in &order {
                remaining[i] = false;
            }
            let cycle = find_cycle(&predecessors, &remaining)
                .into_iter()
                .map(|i| tasks[i].id.clone())
                .collect();
            let task_ids = remaining
                .iter()
                .enumerate()
                .filter(|(_, &r)| r)
                .map(|(i, _)| tasks[i].id.clone())
                .collect();
            return Err(ScheduleError::CyclicDependency {
                project_id: project_id.to_string(),
                task_ids,
                cycle,
            });
        }

        tracing::debug!(
            project = project_id,
            tasks = tasks.len(),
            edges = seen.len(),
            "dependency graph built"
        );

        Ok(Self {
            project_id: project_id.to_string(),
            tasks,
            index,
            order,
            predecessors,
            successors,
            warnings,
        })
    }

    /// Project this graph belongs to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task slice the graph indexes into.
    pub fn tasks(&self) -> &'a [Task] {
        self.tasks
    }

    /// Task at `i`.
    pub fn task(&self, i: usize) -> &'a Task {
        &self.tasks[i]
    }

    /// Index of the task with the given ID.
    pub fn index_of(&self, task_id: &str) -> Option<usize> {
        self.index.get(task_id).copied()
    }

    /// Task indices in topological order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Tie-break key of task `i`: caller sort order, then input position.
    pub fn sort_key(&self, i: usize) -> (i32, usize) {
        (self.tasks[i].sort_order, i)
    }

    /// Task IDs in topological order.
    pub fn ordered_ids(&self) -> Vec<&'a str> {
        self.order.iter().map(|&i| self.tasks[i].id.as_str()).collect()
    }

    /// Immediate predecessors of task `i`.
    pub fn predecessors(&self, i: usize) -> &[Edge] {
        &self.predecessors[i]
    }

    /// Immediate successors of task `i`.
    pub fn successors(&self, i: usize) -> &[Edge] {
        &self.successors[i]
    }

    /// Warnings raised while building.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Kahn's algorithm with ready tasks released by `(sort_order, index)`.
fn topological_order(
    tasks: &[Task],
    predecessors: &[Vec<Edge>],
    successors: &[Vec<Edge>],
) -> Vec<usize> {
    let key = |i: usize| Reverse((tasks[i].sort_order, i));
    let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<(i32, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| key(i))
        .collect();

    let mut order = Vec::with_capacity(predecessors.len());
    while let Some(Reverse((_, node))) = ready.pop() {
        order.push(node);
        for edge in &successors[node] {
            in_degree[edge.task] -= 1;
            if in_degree[edge.task] == 0 {
                ready.push(key(edge.task));
            }
        }
    }
    order
}

/// Walks predecessor links among unordered tasks until one repeats.
///
/// Every unordered task keeps at least one unordered predecessor, so the
/// walk always closes a cycle. Returned in dependency direction, starting
/// from the earliest task in input order and repeating it at the end.
fn find_cycle(predecessors: &[Vec<Edge>], remaining: &[bool]) -> Vec<usize> {
    let Some(start) = remaining.iter().position(|&r| r) else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut position = HashMap::from([(start, 0usize)]);
    let mut current = start;

    loop {
        let Some(next) = predecessors[current]
            .iter()
            .map(|e| e.task)
            .find(|&t| remaining[t])
        else {
            return Vec::new();
        };
        if let Some(&at) = position.get(&next) {
            let mut cycle: Vec<usize> = path[at..].to_vec();
            cycle.reverse();
            if let Some(lowest) = (0..cycle.len()).min_by_key(|&p| cycle[p]) {
                cycle.rotate_left(lowest);
            }
            cycle.push(cycle[0]);
            return cycle;
        }
        position.insert(next, path.len());
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(ids: &[&str]) -> Vec<Task> {
        ids.iter().map(|id| Task::new(*id, "P1").with_duration(1)).collect()
    }

    fn fs(a: &str, b: &str) -> Dependency {
        Dependency::finish_to_start(a, b)
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::build("P1", &[], &[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.order().is_empty());
    }

    #[test]
    fn test_topological_order_chain() {
        let t = tasks(&["C", "B", "A"]);
        let deps = vec![fs("A", "B"), fs("B", "C")];
        let graph = DependencyGraph::build("P1", &t, &deps).unwrap();
        assert_eq!(graph.ordered_ids(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_order_is_stable_for_independent_tasks() {
        let t = tasks(&["X", "A", "M"]);
        let graph = DependencyGraph::build("P1", &t, &[]).unwrap();
        assert_eq!(graph.ordered_ids(), vec!["X", "A", "M"]);
    }

    #[test]
    fn test_sort_order_breaks_ties() {
        let rows = vec![
            Task::new("A", "P1").with_sort_order(0),
            Task::new("B", "P1").with_sort_order(1),
            Task::new("C", "P1").with_sort_order(2),
        ];
        let deps = vec![fs("A", "C"), fs("B", "C")];
        let permuted = vec![rows[1].clone(), rows[0].clone(), rows[2].clone()];

        let first = DependencyGraph::build("P1", &rows, &deps).unwrap();
        let second = DependencyGraph::build("P1", &permuted, &deps).unwrap();
        assert_eq!(first.ordered_ids(), vec!["A", "B", "C"]);
        assert_eq!(first.ordered_ids(), second.ordered_ids());
        assert_eq!(second.sort_key(0), (1, 0));
    }

    #[test]
    fn test_adjacency() {
        let t = tasks(&["A", "B", "C"]);
        let deps = vec![
            fs("A", "B"),
            Dependency::new("A", "C", DependencyKind::StartToStart).with_lag(2),
        ];
        let graph = DependencyGraph::build("P1", &t, &deps).unwrap();
        let a = graph.index_of("A").unwrap();
        let c = graph.index_of("C").unwrap();
        assert_eq!(graph.successors(a).len(), 2);
        assert_eq!(
            graph.predecessors(c),
            &[Edge {
                task: a,
                kind: DependencyKind::StartToStart,
                lag_days: 2
            }]
        );
    }

    #[test]
    fn test_cyclic_dependency() {
        // A -> B -> C -> A, D hangs off the cycle
        let t = tasks(&["A", "B", "C", "D"]);
        let deps = vec![fs("A", "B"), fs("B", "C"), fs("C", "A"), fs("C", "D")];
        let err = DependencyGraph::build("P1", &t, &deps).unwrap_err();
        match err {
            ScheduleError::CyclicDependency {
                project_id,
                task_ids,
                cycle,
            } => {
                assert_eq!(project_id, "P1");
                assert_eq!(task_ids, vec!["A", "B", "C", "D"]);
                assert_eq!(cycle, vec!["A", "B", "C", "A"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_two_task_cycle_path() {
        let t = tasks(&["A", "B"]);
        let err = DependencyGraph::build("P1", &t, &[fs("A", "B"), fs("B", "A")]).unwrap_err();
        let ScheduleError::CyclicDependency { cycle, .. } = err else {
            panic!("expected cycle");
        };
        assert_eq!(cycle, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let t = tasks(&["A"]);
        let err = DependencyGraph::build("P1", &t, &[fs("A", "A")]).unwrap_err();
        let ScheduleError::CyclicDependency { cycle, .. } = err else {
            panic!("expected cycle");
        };
        assert_eq!(cycle, vec!["A", "A"]);
    }

    #[test]
    fn test_unknown_endpoint_dropped() {
        let t = tasks(&["A", "B"]);
        let deps = vec![fs("A", "B"), fs("A", "GHOST")];
        let graph = DependencyGraph::build("P1", &t, &deps).unwrap();
        assert_eq!(graph.warnings().len(), 1);
        assert_eq!(graph.warnings()[0].kind, WarningKind::InvalidDependency);
        assert_eq!(graph.successors(0).len(), 1);
    }

    #[test]
    fn test_duplicate_dependency_dropped() {
        let t = tasks(&["A", "B"]);
        let graph = DependencyGraph::build("P1", &t, &[fs("A", "B"), fs("A", "B")]).unwrap();
        assert_eq!(graph.warnings().len(), 1);
        assert_eq!(graph.predecessors(1).len(), 1);
    }

    #[test]
    fn test_duplicate_task_id() {
        let t = tasks(&["A", "A"]);
        let err = DependencyGraph::build("P1", &t, &[]).unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateTask { .. }));
    }

    #[test]
    fn test_foreign_task() {
        let t = vec![Task::new("A", "P1"), Task::new("B", "P2")];
        let err = DependencyGraph::build("P1", &t, &[]).unwrap_err();
        assert!(matches!(err, ScheduleError::ForeignTask { ref task_id, .. } if task_id == "B"));
    }
}
