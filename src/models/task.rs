//! Task model.
//!
//! A task is a unit of project work with a duration in working days, a
//! budget, and progress. Milestones are tasks of zero duration.
//!
//! Engine-computed fields are grouped in [`TaskSchedule`] and replaced as a
//! unit on every run, never patched field by field.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Task classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Regular work with a duration.
    #[default]
    Normal,
    /// Zero-duration marker.
    Milestone,
}

/// Date constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// No constraint (default scheduling).
    AsSoonAsPossible,
    /// Keeps the computed late dates; no effect on the passes.
    AsLateAsPossible,
    StartNoEarlierThan,
    StartNoLaterThan,
    FinishNoEarlierThan,
    FinishNoLaterThan,
    MustStartOn,
    MustFinishOn,
}

/// A date constraint attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateConstraint {
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Constraint date.
    pub date: NaiveDate,
}

impl DateConstraint {
    /// Creates a constraint.
    pub fn new(kind: ConstraintKind, date: NaiveDate) -> Self {
        Self { kind, date }
    }
}

/// CPM output for one task.
///
/// # Invariants
/// - `early_finish >= early_start`
/// - `total_float == late_start - early_start` (in working days)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchedule {
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    /// Working days the task can slip without delaying the project.
    pub total_float: i64,
    /// Working days the task can slip without delaying any successor.
    pub free_float: i64,
    /// `total_float <= 0`.
    pub is_critical: bool,
    /// Predecessor whose constraint set the early start, if any.
    pub driving_predecessor: Option<String>,
}

/// A project task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub task_type: TaskType,
    /// Duration in working days. Ignored for milestones.
    #[serde(default)]
    pub duration_days: i64,
    #[serde(default)]
    pub budgeted_cost: f64,
    #[serde(default)]
    pub actual_cost: f64,
    /// Progress, nominally 0-100.
    #[serde(default)]
    pub percent_complete: f64,
    /// Manual baseline start.
    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    /// Manual baseline finish.
    #[serde(default)]
    pub planned_finish: Option<NaiveDate>,
    #[serde(default)]
    pub constraint: Option<DateConstraint>,
    /// Display ordering supplied by the caller.
    #[serde(default)]
    pub sort_order: i32,
    /// Last computed schedule. `None` until the first successful run.
    #[serde(default)]
    pub schedule: Option<TaskSchedule>,
}

impl Task {
    /// Creates a normal task with zero duration and budget.
    pub fn new(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: String::new(),
            task_type: TaskType::Normal,
            duration_days: 0,
            budgeted_cost: 0.0,
            actual_cost: 0.0,
            percent_complete: 0.0,
            planned_start: None,
            planned_finish: None,
            constraint: None,
            sort_order: 0,
            schedule: None,
        }
    }

    /// Creates a milestone.
    pub fn milestone(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            task_type: TaskType::Milestone,
            ..Self::new(id, project_id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_duration(mut self, days: i64) -> Self {
        self.duration_days = days;
        self
    }

    pub fn with_budget(mut self, budgeted_cost: f64) -> Self {
        self.budgeted_cost = budgeted_cost;
        self
    }

    pub fn with_actual_cost(mut self, actual_cost: f64) -> Self {
        self.actual_cost = actual_cost;
        self
    }

    pub fn with_progress(mut self, percent_complete: f64) -> Self {
        self.percent_complete = percent_complete;
        self
    }

    /// Sets the manual baseline window.
    pub fn with_planned(mut self, start: NaiveDate, finish: NaiveDate) -> Self {
        self.planned_start = Some(start);
        self.planned_finish = Some(finish);
        self
    }

    pub fn with_planned_start(mut self, start: NaiveDate) -> Self {
        self.planned_start = Some(start);
        self
    }

    pub fn with_constraint(mut self, kind: ConstraintKind, date: NaiveDate) -> Self {
        self.constraint = Some(DateConstraint::new(kind, date));
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_schedule(mut self, schedule: TaskSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Whether this task is a milestone.
    #[inline]
    pub fn is_milestone(&self) -> bool {
        self.task_type == TaskType::Milestone
    }

    /// Progress clamped into 0..=100. NaN reads as 0.
    pub fn progress(&self) -> f64 {
        if self.percent_complete.is_nan() {
            0.0
        } else {
            self.percent_complete.clamp(0.0, 100.0)
        }
    }

    /// Whether progress is outside 0..=100.
    pub fn progress_out_of_range(&self) -> bool {
        !(0.0..=100.0).contains(&self.percent_complete)
    }

    /// Whether the task is fully complete.
    pub fn is_complete(&self) -> bool {
        self.progress() >= 100.0
    }

    /// Effective start: early start if scheduled, else the planned start.
    pub fn effective_start(&self) -> Option<NaiveDate> {
        self.schedule
            .as_ref()
            .map(|s| s.early_start)
            .or(self.planned_start)
    }

    /// Effective finish: early finish if scheduled, else the planned finish.
    pub fn effective_finish(&self) -> Option<NaiveDate> {
        self.schedule
            .as_ref()
            .map(|s| s.early_finish)
            .or(self.planned_finish)
    }

    /// Effective `[start, finish]` window, if both ends are known.
    pub fn effective_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.effective_start()?, self.effective_finish()?))
    }

    /// Whether CPM currently flags this task critical.
    pub fn is_critical(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| s.is_critical)
    }

    /// Current total float, if scheduled.
    pub fn total_float(&self) -> Option<i64> {
        self.schedule.as_ref().map(|s| s.total_float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("T1", "P1")
            .with_name("Framing")
            .with_duration(5)
            .with_budget(1000.0)
            .with_actual_cost(250.0)
            .with_progress(20.0)
            .with_planned(d(3, 1), d(3, 6))
            .with_sort_order(3);

        assert_eq!(task.id, "T1");
        assert_eq!(task.project_id, "P1");
        assert_eq!(task.name, "Framing");
        assert_eq!(task.task_type, TaskType::Normal);
        assert_eq!(task.duration_days, 5);
        assert_eq!(task.sort_order, 3);
        assert_eq!(task.effective_window(), Some((d(3, 1), d(3, 6))));
        assert!(task.schedule.is_none());
    }

    #[test]
    fn test_milestone() {
        let m = Task::milestone("M1", "P1");
        assert!(m.is_milestone());
        assert_eq!(m.duration_days, 0);
    }

    #[test]
    fn test_progress_clamping() {
        assert_eq!(Task::new("a", "p").with_progress(140.0).progress(), 100.0);
        assert_eq!(Task::new("a", "p").with_progress(-5.0).progress(), 0.0);
        assert_eq!(Task::new("a", "p").with_progress(f64::NAN).progress(), 0.0);
        assert!(Task::new("a", "p").with_progress(140.0).progress_out_of_range());
        assert!(!Task::new("a", "p").with_progress(40.0).progress_out_of_range());
    }

    #[test]
    fn test_effective_dates_prefer_schedule() {
        let task = Task::new("T1", "P1")
            .with_planned(d(3, 1), d(3, 6))
            .with_schedule(TaskSchedule {
                early_start: d(3, 4),
                early_finish: d(3, 9),
                late_start: d(3, 4),
                late_finish: d(3, 9),
                total_float: 0,
                free_float: 0,
                is_critical: true,
                driving_predecessor: None,
            });
        assert_eq!(task.effective_window(), Some((d(3, 4), d(3, 9))));
        assert!(task.is_critical());
        assert_eq!(task.total_float(), Some(0));
    }

    #[test]
    fn test_deserialize_defaults() {
        let task: Task = serde_json::from_str(r#"{"id":"T1","project_id":"P1"}"#).unwrap();
        assert_eq!(task.duration_days, 0);
        assert_eq!(task.budgeted_cost, 0.0);
        assert_eq!(task.task_type, TaskType::Normal);
        assert!(task.constraint.is_none());
    }
}
