//! Scheduling pipeline.
//!
//! [`run_project`] takes one project through Graph → CPM → EVM.
//! [`PortfolioEngine::build_report`] fans project runs out over a scoped
//! worker pool, joins, then runs conflict detection and aggregation on the
//! combined results.
//!
//! # Worker Pool
//!
//! - Jobs are queued on a `crossbeam_channel` before workers start.
//! - Each worker owns the project data it pulls; nothing is shared mutably.
//! - Dropping the job sender lets workers drain the queue and exit.
//! - The [`CancellationToken`] is checked before each project starts; a
//!   started project always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::conflict::ConflictDetector;
use crate::error::{ConfigError, ScheduleError, Warning};
use crate::evm::{EvmCalculator, EvmSnapshot, ProjectEarnedValue};
use crate::graph::DependencyGraph;
use crate::models::{Assignment, Dependency, Project, Resource, Task, WorkCalendar};
use crate::portfolio::{PortfolioAggregator, PortfolioReport, ProjectOutcome};
use crate::scheduler::{CpmScheduler, ProjectSchedule};
use crate::store::ScheduleStore;

/// Cooperative cancellation flag shared between a caller and a build.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one project run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRun {
    pub project_id: String,
    pub schedule: ProjectSchedule,
    /// Copies of the input tasks with the new schedule applied.
    pub tasks: Vec<Task>,
    pub earned_value: ProjectEarnedValue,
}

impl ProjectRun {
    /// Rounded EVM totals for write-back.
    pub fn evm_snapshot(&self) -> EvmSnapshot {
        self.earned_value.totals.snapshot()
    }

    /// Scheduler and EVM warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.schedule
            .warnings
            .iter()
            .chain(self.earned_value.warnings.iter())
    }
}

/// Schedules one project and measures its earned value.
///
/// Inputs are not modified. A graph error aborts the run with no partial
/// result.
pub fn run_project(
    project: &Project,
    tasks: &[Task],
    dependencies: &[Dependency],
    as_of: NaiveDate,
    calendar: WorkCalendar,
) -> Result<ProjectRun, ScheduleError> {
    let graph = DependencyGraph::build(&project.id, tasks, dependencies)?;
    let schedule = CpmScheduler::new()
        .with_calendar(calendar)
        .with_project_start(project.planned_start)
        .schedule(&graph, as_of);

    let mut scheduled = tasks.to_vec();
    schedule.apply(&mut scheduled);

    let earned_value = EvmCalculator::new(as_of)
        .with_calendar(calendar)
        .project(&project.id, &scheduled);

    Ok(ProjectRun {
        project_id: project.id.clone(),
        schedule,
        tasks: scheduled,
        earned_value,
    })
}

/// Recomputes one project and writes the results back.
///
/// On a graph error nothing is written, so the store keeps the
/// last-known-good schedule.
pub fn recompute_project<S: ScheduleStore + ?Sized>(
    store: &mut S,
    project_id: &str,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> Result<ProjectRun, ScheduleError> {
    config.validate()?;
    let calendar = config.calendar()?;
    let project = store
        .projects()?
        .into_iter()
        .find(|p| p.id == project_id)
        .ok_or_else(|| ScheduleError::MissingProject(project_id.to_string()))?;
    let tasks = store.tasks(project_id)?;
    let dependencies = store.dependencies(project_id)?;

    let run = run_project(&project, &tasks, &dependencies, as_of, calendar).inspect_err(|err| {
        warn!(project = project_id, error = %err, "recompute aborted, schedule left unchanged");
    })?;

    store.write_task_schedules(project_id, &run.schedule)?;
    store.write_evm_snapshot(project_id, &run.evm_snapshot())?;

    info!(
        project = project_id,
        tasks = run.tasks.len(),
        critical = run.schedule.critical_count(),
        finish = %run.schedule.finish,
        "project recomputed"
    );
    Ok(run)
}

/// Reads the store and builds a portfolio report. Read-only.
pub fn build_portfolio_report<S: ScheduleStore + ?Sized>(
    store: &S,
    as_of: NaiveDate,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<PortfolioReport, ScheduleError> {
    let engine = PortfolioEngine::new(config.clone())?;
    let snapshot = PortfolioSnapshot::load(store)?;
    engine.build_report(snapshot, as_of, cancel)
}

/// One project's records.
#[derive(Debug, Clone)]
pub struct ProjectData {
    pub project: Project,
    pub tasks: Vec<Task>,
    pub dependencies: Vec<Dependency>,
}

/// Everything a portfolio build reads.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSnapshot {
    pub projects: Vec<ProjectData>,
    pub resources: Vec<Resource>,
    pub assignments: Vec<Assignment>,
}

impl PortfolioSnapshot {
    /// Reads every project, resource, and assignment.
    pub fn load<S: ScheduleStore + ?Sized>(store: &S) -> Result<Self, ScheduleError> {
        let projects = store
            .projects()?
            .into_iter()
            .map(|project| -> Result<ProjectData, ScheduleError> {
                Ok(ProjectData {
                    tasks: store.tasks(&project.id)?,
                    dependencies: store.dependencies(&project.id)?,
                    project,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            projects,
            resources: store.resources()?,
            assignments: store.assignments()?,
        })
    }
}

/// Runs projects in parallel and aggregates the portfolio.
#[derive(Debug, Clone)]
pub struct PortfolioEngine {
    config: EngineConfig,
    calendar: WorkCalendar,
}

impl PortfolioEngine {
    /// Validates the configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let calendar = config.calendar()?;
        Ok(Self { config, calendar })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Schedules one project on this engine's calendar.
    pub fn run_project(&self, data: &ProjectData, as_of: NaiveDate) -> Result<ProjectRun, ScheduleError> {
        run_project(
            &data.project,
            &data.tasks,
            &data.dependencies,
            as_of,
            self.calendar,
        )
    }

    /// Builds the portfolio report.
    ///
    /// Projects whose graph fails keep their stored schedule and are listed
    /// as blocked. Archived projects are not scheduled.
    pub fn build_report(
        &self,
        snapshot: PortfolioSnapshot,
        as_of: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<PortfolioReport, ScheduleError> {
        if cancel.is_cancelled() {
            return Err(ScheduleError::Cancelled);
        }

        let PortfolioSnapshot {
            projects,
            resources,
            assignments,
        } = snapshot;

        let mut project_list = Vec::with_capacity(projects.len());
        let mut idle_tasks = Vec::new();
        let mut jobs = Vec::new();
        for data in projects {
            project_list.push(data.project.clone());
            if data.project.is_active() {
                jobs.push(data);
            } else {
                idle_tasks.extend(data.tasks);
            }
        }

        let outcomes = self.run_all(jobs, as_of, cancel);
        if cancel.is_cancelled() {
            info!("portfolio build cancelled");
            return Err(ScheduleError::Cancelled);
        }

        let all_tasks: Vec<Task> = outcomes
            .iter()
            .flat_map(|o| o.tasks.iter().cloned())
            .chain(idle_tasks)
            .collect();
        let conflicts =
            ConflictDetector::new(&project_list, &all_tasks, &resources).detect(&assignments);

        Ok(PortfolioAggregator::from_config(as_of, &self.config).aggregate(outcomes, conflicts))
    }

    /// Fan-out/fan-in over the worker pool. Outcomes keep job order.
    fn run_all(
        &self,
        jobs: Vec<ProjectData>,
        as_of: NaiveDate,
        cancel: &CancellationToken,
    ) -> Vec<ProjectOutcome> {
        let total = jobs.len();
        let workers = self.config.parallelism().min(total).max(1);

        let (job_tx, job_rx) = unbounded();
        for job in jobs.into_iter().enumerate() {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        let (out_tx, out_rx) = unbounded();
        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let out_tx = out_tx.clone();
                scope.spawn(move || {
                    let mut done = 0usize;
                    while let Ok((index, data)) = job_rx.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let outcome = self.outcome(data, as_of);
                        done += 1;
                        if out_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                    debug!(worker, projects = done, "worker finished");
                });
            }
        });
        drop(out_tx);

        let mut slots: Vec<Option<ProjectOutcome>> = (0..total).map(|_| None).collect();
        for (index, outcome) in out_rx.try_iter() {
            slots[index] = Some(outcome);
        }
        debug!(projects = total, workers, "project runs joined");
        slots.into_iter().flatten().collect()
    }

    fn outcome(&self, data: ProjectData, as_of: NaiveDate) -> ProjectOutcome {
        match self.run_project(&data, as_of) {
            Ok(run) => ProjectOutcome {
                project: data.project,
                tasks: run.tasks,
                earned_value: run.earned_value,
                blocked: None,
                warnings: run.schedule.warnings,
            },
            Err(err) => {
                warn!(
                    project = %data.project.id,
                    error = %err,
                    "project blocked, using last-known-good schedule"
                );
                let earned_value = EvmCalculator::new(as_of)
                    .with_calendar(self.calendar)
                    .project(&data.project.id, &data.tasks);
                ProjectOutcome {
                    project: data.project,
                    tasks: data.tasks,
                    earned_value,
                    blocked: Some(err.to_string()),
                    warnings: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectStatus, TaskSchedule};
    use crate::portfolio::ProjectHealth;
    use crate::store::InMemoryStore;

    fn day(n: i64) -> NaiveDate {
        crate::models::shift(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), n)
    }

    fn example_store() -> InMemoryStore {
        InMemoryStore::new()
            .with_project(Project::new("P1").with_name("Depot").with_planned_start(day(0)))
            .with_tasks([
                Task::new("T1", "P1").with_duration(3).with_budget(300.0),
                Task::new("T2", "P1").with_duration(2).with_budget(200.0),
                Task::new("T3", "P1").with_duration(4).with_budget(400.0),
            ])
            .with_dependencies([
                Dependency::finish_to_start("T1", "T2"),
                Dependency::finish_to_start("T1", "T3"),
            ])
    }

    #[test]
    fn test_run_project_does_not_mutate_input() {
        let store = example_store();
        let project = Project::new("P1").with_planned_start(day(0));
        let tasks = store.tasks("P1").unwrap();
        let deps = store.dependencies("P1").unwrap();

        let run = run_project(&project, &tasks, &deps, day(0), WorkCalendar::continuous()).unwrap();
        assert!(tasks.iter().all(|t| t.schedule.is_none()));
        assert_eq!(run.schedule.finish, day(7));
        assert_eq!(run.tasks[2].total_float(), Some(0));
        assert_eq!(run.tasks[1].total_float(), Some(2));
        assert_eq!(run.earned_value.totals.bac, 900.0);
    }

    #[test]
    fn test_recompute_writes_back() {
        let mut store = example_store();
        let run = recompute_project(&mut store, "P1", day(3), &EngineConfig::default()).unwrap();

        let t3 = store.task("T3").unwrap().schedule.clone().unwrap();
        assert_eq!(t3.early_start, day(3));
        assert_eq!(t3.early_finish, day(7));
        assert!(t3.is_critical);
        assert_eq!(store.evm_snapshot("P1"), Some(&run.evm_snapshot()));
        // T1 fully planned by day 3.
        assert_eq!(store.evm_snapshot("P1").unwrap().pv, 300.0);
    }

    #[test]
    fn test_recompute_cycle_writes_nothing() {
        let previous = TaskSchedule {
            early_start: day(0),
            early_finish: day(1),
            late_start: day(0),
            late_finish: day(1),
            total_float: 0,
            free_float: 0,
            is_critical: true,
            driving_predecessor: None,
        };
        let mut store = InMemoryStore::new()
            .with_project(Project::new("P1"))
            .with_tasks([
                Task::new("A", "P1").with_duration(1).with_schedule(previous.clone()),
                Task::new("B", "P1").with_duration(1),
            ])
            .with_dependencies([
                Dependency::finish_to_start("A", "B"),
                Dependency::finish_to_start("B", "A"),
            ]);

        let err = recompute_project(&mut store, "P1", day(0), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::CyclicDependency { .. }));
        assert_eq!(store.task("A").unwrap().schedule, Some(previous));
        assert!(store.task("B").unwrap().schedule.is_none());
        assert!(store.evm_snapshot("P1").is_none());
    }

    #[test]
    fn test_recompute_missing_project() {
        let mut store = example_store();
        let err = recompute_project(&mut store, "P9", day(0), &EngineConfig::default()).unwrap_err();
        assert_eq!(err, ScheduleError::MissingProject("P9".into()));
    }

    #[test]
    fn test_recompute_invalid_config() {
        let mut store = example_store();
        let mut config = EngineConfig::default();
        config.calendar.work_days.clear();
        let err = recompute_project(&mut store, "P1", day(0), &config).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidConfig(_)));
    }

    #[test]
    fn test_recompute_rejects_what_portfolio_rejects() {
        let mut store = example_store();
        let negative_horizon = EngineConfig {
            milestone_horizon_days: -1,
            ..EngineConfig::default()
        };
        let mut inverted = EngineConfig::default();
        inverted.health.behind_float_days = 3;

        for config in [negative_horizon, inverted] {
            let err = recompute_project(&mut store, "P1", day(0), &config).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidConfig(_)));
            let err = build_portfolio_report(&store, day(0), &config, &CancellationToken::new())
                .unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidConfig(_)));
        }
        assert!(store.task("T1").unwrap().schedule.is_none());
    }

    fn portfolio_store() -> InMemoryStore {
        example_store()
            .with_project(Project::new("P2").with_name("Bridge").with_planned_start(day(2)))
            .with_project(Project::new("P3").with_status(ProjectStatus::Archived))
            .with_tasks([
                Task::new("B1", "P2").with_duration(4),
                Task::milestone("B2", "P2"),
                Task::new("Z1", "P3").with_planned(day(0), day(30)),
            ])
            .with_dependencies([Dependency::finish_to_start("B1", "B2")])
            .with_resources([Resource::labor("R1").with_name("Crane crew")])
            .with_assignments([
                Assignment::new("T1", "R1"),
                Assignment::new("B1", "R1"),
                Assignment::new("Z1", "R1"),
            ])
    }

    #[test]
    fn test_portfolio_report() {
        let store = portfolio_store();
        let report =
            build_portfolio_report(&store, day(0), &EngineConfig::default(), &CancellationToken::new())
                .unwrap();

        let ids: Vec<&str> = report.projects.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);
        assert!(report.projects.iter().all(|p| p.health == ProjectHealth::OnTrack));

        // T1 [0,3] vs B1 [2,6]; the archived project never conflicts.
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].overlap_start, day(2));
        assert_eq!(report.conflicts[0].overlap_end, day(3));
        assert!(report.resource_utilization[0].is_over_allocated);
        assert!(report.warnings.is_empty());

        assert_eq!(report.milestones.len(), 1);
        assert_eq!(report.milestones[0].date, day(6));
        assert_eq!(report.summary.total_projects, 2);

        // Read-only.
        assert!(store.all_tasks().iter().all(|t| t.schedule.is_none()));
    }

    #[test]
    fn test_blocked_project_uses_stored_schedule() {
        let stored = TaskSchedule {
            early_start: day(0),
            early_finish: day(2),
            late_start: day(0),
            late_finish: day(2),
            total_float: 0,
            free_float: 0,
            is_critical: true,
            driving_predecessor: None,
        };
        let store = example_store()
            .with_project(Project::new("P2"))
            .with_tasks([
                Task::new("C1", "P2").with_duration(2).with_schedule(stored.clone()),
                Task::new("C2", "P2").with_duration(2),
            ])
            .with_dependencies([
                Dependency::finish_to_start("C1", "C2"),
                Dependency::finish_to_start("C2", "C1"),
            ]);

        let report =
            build_portfolio_report(&store, day(0), &EngineConfig::default(), &CancellationToken::new())
                .unwrap();
        assert_eq!(report.blocked_projects.len(), 1);
        assert_eq!(report.blocked_projects[0].project_id, "P2");
        assert!(report.blocked_projects[0].error.contains("circular dependency"));

        let p2 = &report.projects[1];
        assert!(p2.blocked);
        assert_eq!(p2.critical_tasks, 1);
        assert_eq!(p2.finish, Some(day(2)));
        assert!(!report.projects[0].blocked);
    }

    #[test]
    fn test_parallelism_does_not_change_report() {
        let store = portfolio_store();
        let cancel = CancellationToken::new();
        let serial = EngineConfig {
            max_parallelism: Some(1),
            ..EngineConfig::default()
        };
        let parallel = EngineConfig {
            max_parallelism: Some(4),
            ..EngineConfig::default()
        };
        let a = build_portfolio_report(&store, day(1), &serial, &cancel).unwrap();
        let b = build_portfolio_report(&store, day(1), &parallel, &cancel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cancelled_build() {
        let store = portfolio_store();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = build_portfolio_report(&store, day(0), &EngineConfig::default(), &cancel).unwrap_err();
        assert_eq!(err, ScheduleError::Cancelled);
    }

    #[test]
    fn test_empty_portfolio() {
        let store = InMemoryStore::new();
        let report =
            build_portfolio_report(&store, day(0), &EngineConfig::default(), &CancellationToken::new())
                .unwrap();
        assert!(report.projects.is_empty());
        assert_eq!(report.summary.total_projects, 0);
        assert_eq!(report.evm.spi, 1.0);
    }
}
