//! Critical Path Method scheduler.
//!
//! # Algorithm
//!
//! 1. Pick the project origin (earliest planned start among root tasks,
//!    else the project's planned start, else today) and snap it to a
//!    working day.
//! 2. Forward pass in topological order: early start is the maximum of the
//!    constraints imposed by each incoming edge, never before the origin;
//!    forward date constraints are applied on top.
//! 3. Project finish is the latest early finish.
//! 4. Backward pass in reverse order: late finish is the minimum of the
//!    constraints imposed by each outgoing edge, capped at the project
//!    finish; backward date constraints are applied on top.
//! 5. Total float = LS - ES, free float against each successor, critical
//!    iff total float <= 0.
//!
//! All arithmetic runs on integer working-day offsets from the origin and
//! is converted to dates only for output, so `LS - ES == LF - EF` holds
//! exactly.
//!
//! # Complexity
//! O(V + E) passes plus calendar conversion per task.
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Warning, WarningKind};
use crate::graph::DependencyGraph;
use crate::models::{ConstraintKind, DependencyKind, Task, TaskSchedule, WorkCalendar};

/// Computed schedule for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub schedule: TaskSchedule,
}

/// CPM result for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSchedule {
    pub project_id: String,
    /// Day offset 0.
    pub origin: NaiveDate,
    /// Latest early finish.
    pub finish: NaiveDate,
    /// Per-task results in input order.
    pub tasks: Vec<ScheduledTask>,
    /// All critical task IDs in topological order.
    pub critical_path: Vec<String>,
    /// Degraded-continuation warnings (graph and scheduler).
    pub warnings: Vec<Warning>,
}

impl ProjectSchedule {
    /// Schedule of a task.
    pub fn get(&self, task_id: &str) -> Option<&TaskSchedule> {
        self.tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| &t.schedule)
    }

    /// Number of critical tasks.
    pub fn critical_count(&self) -> usize {
        self.critical_path.len()
    }

    /// Overwrites every task's schedule with this result.
    ///
    /// Tasks not covered by this schedule are cleared, so no stale values
    /// survive a run.
    pub fn apply(&self, tasks: &mut [Task]) {
        for task in tasks {
            task.schedule = self.get(&task.id).cloned();
        }
    }
}

/// CPM scheduler.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_project::graph::DependencyGraph;
/// use u_project::models::{Dependency, Task};
/// use u_project::scheduler::CpmScheduler;
///
/// let tasks = vec![
///     Task::new("T1", "P").with_duration(3),
///     Task::new("T2", "P").with_duration(2),
/// ];
/// let deps = vec![Dependency::finish_to_start("T1", "T2")];
/// let graph = DependencyGraph::build("P", &tasks, &deps).unwrap();
///
/// let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let schedule = CpmScheduler::new().schedule(&graph, today);
/// assert_eq!(schedule.finish, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
/// assert_eq!(schedule.critical_path, vec!["T1", "T2"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpmScheduler {
    calendar: WorkCalendar,
    project_start: Option<NaiveDate>,
}

impl CpmScheduler {
    /// Creates a scheduler on a continuous calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working calendar.
    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Sets the project's planned start, used when no root task has one.
    pub fn with_project_start(mut self, date: Option<NaiveDate>) -> Self {
        self.project_start = date;
        self
    }

    /// Runs the forward and backward passes.
    ///
    /// `today` is the origin of last resort.
    pub fn schedule(&self, graph: &DependencyGraph<'_>, today: NaiveDate) -> ProjectSchedule {
        let n = graph.len();
        let mut warnings = graph.warnings().to_vec();

        let origin = self.calendar.snap_forward(self.origin(graph, today));
        let offset = |date: NaiveDate| {
            self.calendar
                .work_days_between(origin, self.calendar.snap_forward(date))
        };

        // Longest span that still lands on a representable date.
        let max_duration = self.calendar.work_days_between(origin, NaiveDate::MAX);
        let durations: Vec<i64> = graph
            .tasks()
            .iter()
            .map(|task| effective_duration(task, max_duration, &mut warnings))
            .collect();

        // Forward pass
        let mut es = vec![0i64; n];
        let mut ef = vec![0i64; n];
        let mut driver: Vec<Option<usize>> = vec![None; n];
        for &i in graph.order() {
            let dur = durations[i];
            let mut start = 0;
            for edge in graph.predecessors(i) {
                let p = edge.task;
                let candidate = match edge.kind {
                    DependencyKind::FinishToStart => ef[p].saturating_add(edge.lag_days),
                    DependencyKind::StartToStart => es[p].saturating_add(edge.lag_days),
                    DependencyKind::FinishToFinish => {
                        ef[p].saturating_add(edge.lag_days).saturating_sub(dur)
                    }
                    DependencyKind::StartToFinish => {
                        es[p].saturating_add(edge.lag_days).saturating_sub(dur)
                    }
                };
                // Ties go to the predecessor with the lower sort key.
                let wins = match driver[i] {
                    _ if candidate > start => true,
                    Some(d) => candidate == start && graph.sort_key(p) < graph.sort_key(d),
                    None => candidate == start,
                };
                if wins {
                    start = candidate;
                    driver[i] = Some(p);
                }
            }

            if let Some(c) = graph.task(i).constraint {
                let c_off = offset(c.date);
                let constrained = match c.kind {
                    ConstraintKind::StartNoEarlierThan => start.max(c_off),
                    ConstraintKind::StartNoLaterThan => start.min(c_off),
                    ConstraintKind::FinishNoEarlierThan => start.max(c_off.saturating_sub(dur)),
                    ConstraintKind::FinishNoLaterThan => start.min(c_off.saturating_sub(dur)),
                    ConstraintKind::MustStartOn => c_off,
                    ConstraintKind::MustFinishOn => c_off.saturating_sub(dur),
                    ConstraintKind::AsSoonAsPossible | ConstraintKind::AsLateAsPossible => start,
                };
                if constrained != start {
                    driver[i] = None;
                    start = constrained;
                }
            }

            es[i] = start;
            ef[i] = start.saturating_add(dur);
        }

        let finish = ef.iter().copied().max().unwrap_or(0);

        // Backward pass
        let mut ls = vec![0i64; n];
        let mut lf = vec![0i64; n];
        for &i in graph.order().iter().rev() {
            let dur = durations[i];
            let mut late = finish;
            for edge in graph.successors(i) {
                let s = edge.task;
                let candidate = match edge.kind {
                    DependencyKind::FinishToStart => ls[s].saturating_sub(edge.lag_days),
                    DependencyKind::StartToStart => {
                        ls[s].saturating_sub(edge.lag_days).saturating_add(dur)
                    }
                    DependencyKind::FinishToFinish => lf[s].saturating_sub(edge.lag_days),
                    DependencyKind::StartToFinish => {
                        lf[s].saturating_sub(edge.lag_days).saturating_add(dur)
                    }
                };
                late = late.min(candidate);
            }

            if let Some(c) = graph.task(i).constraint {
                let c_off = offset(c.date);
                late = match c.kind {
                    ConstraintKind::FinishNoLaterThan => late.min(c_off),
                    ConstraintKind::FinishNoEarlierThan => late.max(c_off),
                    ConstraintKind::StartNoLaterThan => late.min(c_off.saturating_add(dur)),
                    ConstraintKind::StartNoEarlierThan => late.max(c_off.saturating_add(dur)),
                    ConstraintKind::MustFinishOn => c_off,
                    ConstraintKind::MustStartOn => c_off.saturating_add(dur),
                    ConstraintKind::AsSoonAsPossible | ConstraintKind::AsLateAsPossible => late,
                };
            }

            lf[i] = late;
            ls[i] = late.saturating_sub(dur);
        }

        let date = |off: i64| self.calendar.add_work_days(origin, off);

        let mut critical = vec![false; n];
        let tasks = graph
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let total_float = ls[i].saturating_sub(es[i]);
                let free_float = free_float(graph, i, &es, &ef, finish).min(total_float);
                critical[i] = total_float <= 0;
                ScheduledTask {
                    task_id: task.id.clone(),
                    schedule: TaskSchedule {
                        early_start: date(es[i]),
                        early_finish: date(ef[i]),
                        late_start: date(ls[i]),
                        late_finish: date(lf[i]),
                        total_float,
                        free_float,
                        is_critical: critical[i],
                        driving_predecessor: driver[i].map(|p| graph.task(p).id.clone()),
                    },
                }
            })
            .collect();

        let critical_path: Vec<String> = graph
            .order()
            .iter()
            .filter(|&&i| critical[i])
            .map(|&i| graph.task(i).id.clone())
            .collect();

        let schedule = ProjectSchedule {
            project_id: graph.project_id().to_string(),
            origin,
            finish: date(finish),
            tasks,
            critical_path,
            warnings,
        };

        tracing::info!(
            project = %schedule.project_id,
            tasks = n,
            critical = schedule.critical_path.len(),
            origin = %schedule.origin,
            finish = %schedule.finish,
            "cpm pass complete"
        );

        schedule
    }

    fn origin(&self, graph: &DependencyGraph<'_>, today: NaiveDate) -> NaiveDate {
        (0..graph.len())
            .filter(|&i| graph.predecessors(i).is_empty())
            .filter_map(|i| graph.task(i).planned_start)
            .min()
            .or(self.project_start)
            .unwrap_or(today)
    }
}

/// Scheduling duration: zero for milestones, negative values degrade to zero,
/// values past the last representable date are clamped to `max`.
fn effective_duration(task: &Task, max: i64, warnings: &mut Vec<Warning>) -> i64 {
    if task.is_milestone() {
        return 0;
    }
    if task.duration_days < 0 {
        warnings.push(Warning::new(
            WarningKind::InvalidDuration,
            task.id.clone(),
            format!(
                "Task '{}' has negative duration {}; scheduled as 0",
                task.id, task.duration_days
            ),
        ));
        return 0;
    }
    if task.duration_days > max {
        warnings.push(Warning::new(
            WarningKind::InvalidDuration,
            task.id.clone(),
            format!(
                "Task '{}' has duration {} beyond the calendar range; clamped to {}",
                task.id, task.duration_days, max
            ),
        ));
        return max;
    }
    task.duration_days
}

/// Slack to the nearest successor constraint, or to the project finish.
fn free_float(graph: &DependencyGraph<'_>, i: usize, es: &[i64], ef: &[i64], finish: i64) -> i64 {
    graph
        .successors(i)
        .iter()
        .map(|edge| {
            let s = edge.task;
            match edge.kind {
                DependencyKind::FinishToStart => es[s].saturating_sub(edge.lag_days).saturating_sub(ef[i]),
                DependencyKind::StartToStart => es[s].saturating_sub(edge.lag_days).saturating_sub(es[i]),
                DependencyKind::FinishToFinish => ef[s].saturating_sub(edge.lag_days).saturating_sub(ef[i]),
                DependencyKind::StartToFinish => ef[s].saturating_sub(edge.lag_days).saturating_sub(es[i]),
            }
        })
        .min()
        .unwrap_or(finish.saturating_sub(ef[i]))
}
