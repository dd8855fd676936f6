//! Portfolio aggregation.
//!
//! Folds per-project results (scheduled tasks and earned value) and the
//! cross-project conflict analysis into a [`PortfolioReport`].
//!
//! # Health
//!
//! Heuristic classification from the critical-path float and overdue work:
//!
//! | Health | Condition |
//! |--------|-----------|
//! | Behind | a task finished before `as_of` is incomplete, or min float < behind threshold |
//! | AtRisk | min float < at-risk threshold |
//! | OnTrack | otherwise |
//!
//! Min float is taken over critical tasks and is 0 when there are none.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, HealthThresholds};
use crate::conflict::{ConflictAnalysis, ResourceConflict, ResourceUtilization};
use crate::error::Warning;
use crate::evm::{round_percent, EarnedValue, EvmSnapshot, ProjectEarnedValue};
use crate::models::{shift, Project, ProjectStatus, Task};

/// Project health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectHealth {
    OnTrack,
    AtRisk,
    Behind,
}

/// Per-project row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub project_name: String,
    pub status: ProjectStatus,
    pub total_tasks: usize,
    pub critical_tasks: usize,
    pub milestones: usize,
    pub completed_milestones: usize,
    /// Mean percent complete, rounded.
    pub progress_percent: i64,
    /// Mean percent complete, unrounded.
    pub progress_raw: f64,
    pub min_float: i64,
    pub health: ProjectHealth,
    /// Latest effective finish among the project's tasks.
    pub finish: Option<NaiveDate>,
    pub evm: EvmSnapshot,
    /// Graph error kept the last-known-good schedule.
    pub blocked: bool,
}

/// An incomplete milestone inside the reporting horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneEntry {
    pub project_id: String,
    pub project_name: String,
    pub task_id: String,
    pub task_name: String,
    pub date: NaiveDate,
    pub is_critical: bool,
    pub is_overdue: bool,
}

/// A project whose graph could not be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedProject {
    pub project_id: String,
    pub project_name: String,
    pub error: String,
}

/// Headline counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_projects: usize,
    pub on_track: usize,
    pub at_risk: usize,
    pub behind: usize,
    pub blocked: usize,
    pub upcoming_milestones: usize,
    pub overdue_milestones: usize,
    pub conflicts: usize,
}

/// Portfolio-level report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub as_of: NaiveDate,
    pub projects: Vec<ProjectSummary>,
    pub milestones: Vec<MilestoneEntry>,
    pub conflicts: Vec<ResourceConflict>,
    pub resource_utilization: Vec<ResourceUtilization>,
    pub summary: PortfolioSummary,
    /// Earned value summed over every project.
    pub evm: EvmSnapshot,
    pub blocked_projects: Vec<BlockedProject>,
    pub warnings: Vec<Warning>,
}

/// One project's input to the aggregator.
#[derive(Debug, Clone)]
pub struct ProjectOutcome {
    pub project: Project,
    /// Tasks carrying their current (or last-known-good) schedule.
    pub tasks: Vec<Task>,
    pub earned_value: ProjectEarnedValue,
    /// Graph error text when the project could not be rescheduled.
    pub blocked: Option<String>,
    pub warnings: Vec<Warning>,
}

/// Builds portfolio reports.
#[derive(Debug, Clone)]
pub struct PortfolioAggregator {
    as_of: NaiveDate,
    horizon_days: i64,
    thresholds: HealthThresholds,
}

impl PortfolioAggregator {
    pub fn new(as_of: NaiveDate) -> Self {
        Self::from_config(as_of, &EngineConfig::default())
    }

    /// Takes the milestone horizon and health thresholds from config.
    pub fn from_config(as_of: NaiveDate, config: &EngineConfig) -> Self {
        Self {
            as_of,
            horizon_days: config.milestone_horizon_days,
            thresholds: config.health.clone(),
        }
    }

    /// Folds project outcomes and conflicts into a report.
    ///
    /// Archived projects are left out.
    pub fn aggregate(
        &self,
        outcomes: Vec<ProjectOutcome>,
        conflicts: ConflictAnalysis,
    ) -> PortfolioReport {
        let mut projects = Vec::new();
        let mut milestones = Vec::new();
        let mut blocked_projects = Vec::new();
        let mut warnings = Vec::new();
        let mut totals = EarnedValue::default();

        for outcome in outcomes.into_iter().filter(|o| o.project.is_active()) {
            projects.push(self.summarize(&outcome));
            milestones.extend(self.upcoming_milestones(&outcome.project, &outcome.tasks));
            totals.accumulate(&outcome.earned_value.totals);
            if let Some(error) = &outcome.blocked {
                blocked_projects.push(BlockedProject {
                    project_id: outcome.project.id.clone(),
                    project_name: outcome.project.name.clone(),
                    error: error.clone(),
                });
            }
            warnings.extend(outcome.warnings);
            warnings.extend(outcome.earned_value.warnings);
        }
        warnings.extend(conflicts.warnings);

        milestones.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.project_id.cmp(&b.project_id))
                .then_with(|| a.task_id.cmp(&b.task_id))
        });

        let count = |h: ProjectHealth| projects.iter().filter(|p| p.health == h).count();
        let summary = PortfolioSummary {
            total_projects: projects.len(),
            on_track: count(ProjectHealth::OnTrack),
            at_risk: count(ProjectHealth::AtRisk),
            behind: count(ProjectHealth::Behind),
            blocked: blocked_projects.len(),
            upcoming_milestones: milestones.len(),
            overdue_milestones: milestones.iter().filter(|m| m.is_overdue).count(),
            conflicts: conflicts.conflicts.len(),
        };

        tracing::info!(
            as_of = %self.as_of,
            projects = summary.total_projects,
            behind = summary.behind,
            at_risk = summary.at_risk,
            conflicts = summary.conflicts,
            "portfolio report built"
        );

        PortfolioReport {
            as_of: self.as_of,
            projects,
            milestones,
            conflicts: conflicts.conflicts,
            resource_utilization: conflicts.utilization,
            summary,
            evm: totals.snapshot(),
            blocked_projects,
            warnings,
        }
    }

    /// Summary row for one project.
    pub fn summarize(&self, outcome: &ProjectOutcome) -> ProjectSummary {
        let tasks = &outcome.tasks;
        let milestones = tasks.iter().filter(|t| t.is_milestone());
        let progress_raw = if tasks.is_empty() {
            0.0
        } else {
            tasks.iter().map(Task::progress).sum::<f64>() / tasks.len() as f64
        };
        let min_float = min_critical_float(tasks);

        ProjectSummary {
            project_id: outcome.project.id.clone(),
            project_name: outcome.project.name.clone(),
            status: outcome.project.status,
            total_tasks: tasks.len(),
            critical_tasks: tasks.iter().filter(|t| t.is_critical()).count(),
            milestones: milestones.clone().count(),
            completed_milestones: milestones.filter(|t| t.is_complete()).count(),
            progress_percent: round_percent(progress_raw),
            progress_raw,
            min_float,
            health: self.health(tasks, min_float),
            finish: tasks.iter().filter_map(Task::effective_finish).max(),
            evm: outcome.earned_value.totals.snapshot(),
            blocked: outcome.blocked.is_some(),
        }
    }

    /// Classifies a project.
    pub fn health(&self, tasks: &[Task], min_float: i64) -> ProjectHealth {
        let overdue = tasks.iter().any(|t| {
            !t.is_complete() && t.effective_finish().is_some_and(|f| f < self.as_of)
        });
        if overdue || min_float < self.thresholds.behind_float_days {
            ProjectHealth::Behind
        } else if min_float < self.thresholds.at_risk_float_days {
            ProjectHealth::AtRisk
        } else {
            ProjectHealth::OnTrack
        }
    }

    fn upcoming_milestones(&self, project: &Project, tasks: &[Task]) -> Vec<MilestoneEntry> {
        let horizon = shift(self.as_of, self.horizon_days);
        tasks
            .iter()
            .filter(|t| t.is_milestone() && !t.is_complete())
            .filter_map(|t| {
                let date = t.effective_finish()?;
                (date <= horizon).then(|| MilestoneEntry {
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    task_id: t.id.clone(),
                    task_name: t.name.clone(),
                    date,
                    is_critical: t.is_critical(),
                    is_overdue: date < self.as_of,
                })
            })
            .collect()
    }
}

fn min_critical_float(tasks: &[Task]) -> i64 {
    tasks
        .iter()
        .filter(|t| t.is_critical())
        .filter_map(Task::total_float)
        .min()
        .unwrap_or(0)
}
