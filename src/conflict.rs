//! Cross-project resource conflict detection.
//!
//! Reports every pair of assignments that book the same resource for
//! overlapping windows in two different projects. Same-project overlaps are
//! a leveling concern and are not reported.
//!
//! # Algorithm
//!
//! 1. Resolve assignments to (project, task, window); drop unresolvable ones
//!    with a warning.
//! 2. Group by resource, partition each group by project.
//! 3. Skip resources used by a single project.
//! 4. Compare every task pair across every project pair:
//!    overlap iff `s1 <= f2 && s2 <= f1` (inclusive windows).
//!
//! # Complexity
//! O(k²) per resource with k assignments. Per-resource counts are small.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Warning, WarningKind};
use crate::models::{shift, Assignment, Project, Resource, Task};

/// One side of a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSide {
    pub project_id: String,
    pub project_name: String,
    pub task_id: String,
    pub task_name: String,
    pub start: NaiveDate,
    pub finish: NaiveDate,
}

/// A resource double-booked across two projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConflict {
    pub resource_id: String,
    pub resource_name: String,
    pub first: ConflictSide,
    pub second: ConflictSide,
    pub overlap_start: NaiveDate,
    pub overlap_end: NaiveDate,
}

/// Booking summary for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,
    /// Distinct projects with an assignment on this resource.
    pub project_count: usize,
    pub total_assignments: usize,
    /// Booked by more than one project at the same time.
    pub is_over_allocated: bool,
    /// Highest summed units on any single day.
    pub peak_units: f64,
    pub max_units: f64,
    /// `peak_units > max_units`.
    pub exceeds_capacity: bool,
}

/// Detector output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictAnalysis {
    pub conflicts: Vec<ResourceConflict>,
    /// Sorted by assignment count (descending), then resource ID.
    pub utilization: Vec<ResourceUtilization>,
    pub warnings: Vec<Warning>,
}

struct Booking<'a> {
    project: &'a Project,
    task: &'a Task,
    units: f64,
    window: Option<(NaiveDate, NaiveDate)>,
}

/// Cross-project conflict detector over a snapshot of the portfolio.
#[derive(Debug, Clone)]
pub struct ConflictDetector<'a> {
    projects: HashMap<&'a str, &'a Project>,
    tasks: HashMap<&'a str, &'a Task>,
    resources: HashMap<&'a str, &'a Resource>,
}

impl<'a> ConflictDetector<'a> {
    /// Indexes projects, tasks (of all projects), and resources.
    ///
    /// Task windows are read through [`Task::effective_window`], so tasks
    /// should carry their latest schedule.
    pub fn new(projects: &'a [Project], tasks: &'a [Task], resources: &'a [Resource]) -> Self {
        let mut task_index = HashMap::with_capacity(tasks.len());
        for task in tasks {
            task_index.entry(task.id.as_str()).or_insert(task);
        }
        Self {
            projects: projects.iter().map(|p| (p.id.as_str(), p)).collect(),
            tasks: task_index,
            resources: resources.iter().map(|r| (r.id.as_str(), r)).collect(),
        }
    }

    /// Runs detection over the given assignments.
    pub fn detect(&self, assignments: &[Assignment]) -> ConflictAnalysis {
        let mut warnings = Vec::new();
        let mut by_resource: BTreeMap<&str, Vec<Booking<'a>>> = BTreeMap::new();

        for a in assignments {
            if let Some(booking) = self.resolve(a, &mut warnings) {
                by_resource
                    .entry(a.resource_id.as_str())
                    .or_default()
                    .push(booking);
            }
        }

        let mut conflicts = Vec::new();
        let mut utilization = Vec::with_capacity(by_resource.len());

        for (resource_id, bookings) in &by_resource {
            let Some(resource) = self.resources.get(resource_id) else {
                continue;
            };

            let mut groups: Vec<(&str, Vec<&Booking<'a>>)> = Vec::new();
            for b in bookings {
                match groups.iter_mut().find(|(pid, _)| *pid == b.project.id) {
                    Some((_, members)) => members.push(b),
                    None => groups.push((b.project.id.as_str(), vec![b])),
                }
            }

            let before = conflicts.len();
            if groups.len() > 1 {
                cross_project_conflicts(resource, &groups, &mut conflicts);
            } else {
                tracing::trace!(resource = resource_id, "single-project resource skipped");
            }

            let peak_units = peak_units(bookings);
            utilization.push(ResourceUtilization {
                resource_id: resource.id.clone(),
                resource_name: resource.name.clone(),
                resource_type: resource.resource_type.label().to_string(),
                project_count: groups.len(),
                total_assignments: bookings.len(),
                is_over_allocated: conflicts.len() > before,
                peak_units,
                max_units: resource.max_units,
                exceeds_capacity: peak_units > resource.max_units,
            });
        }

        utilization.sort_by(|a, b| b.total_assignments.cmp(&a.total_assignments));

        tracing::info!(
            resources = utilization.len(),
            conflicts = conflicts.len(),
            skipped = warnings.len(),
            "resource conflict detection complete"
        );

        ConflictAnalysis {
            conflicts,
            utilization,
            warnings,
        }
    }

    fn resolve(&self, a: &Assignment, warnings: &mut Vec<Warning>) -> Option<Booking<'a>> {
        let entity = format!("{}@{}", a.task_id, a.resource_id);
        let Some(&task) = self.tasks.get(a.task_id.as_str()) else {
            warnings.push(Warning::new(
                WarningKind::MissingTask,
                entity,
                format!("Assignment references unknown task '{}'", a.task_id),
            ));
            return None;
        };
        if !self.resources.contains_key(a.resource_id.as_str()) {
            warnings.push(Warning::new(
                WarningKind::MissingResource,
                entity,
                format!("Assignment references unknown resource '{}'", a.resource_id),
            ));
            return None;
        }
        let Some(&project) = self.projects.get(task.project_id.as_str()) else {
            warnings.push(Warning::new(
                WarningKind::MissingProject,
                entity,
                format!(
                    "Task '{}' references unknown project '{}'",
                    task.id, task.project_id
                ),
            ));
            return None;
        };
        if !project.is_active() {
            return None;
        }
        Some(Booking {
            project,
            task,
            units: a.units,
            window: task.effective_window(),
        })
    }
}

fn cross_project_conflicts(
    resource: &Resource,
    groups: &[(&str, Vec<&Booking<'_>>)],
    out: &mut Vec<ResourceConflict>,
) {
    for (i, (_, first_group)) in groups.iter().enumerate() {
        for (_, second_group) in &groups[i + 1..] {
            for b1 in first_group {
                let Some((s1, f1)) = b1.window else { continue };
                for b2 in second_group {
                    let Some((s2, f2)) = b2.window else { continue };
                    if s1 <= f2 && s2 <= f1 {
                        out.push(ResourceConflict {
                            resource_id: resource.id.clone(),
                            resource_name: resource.name.clone(),
                            first: side(b1, s1, f1),
                            second: side(b2, s2, f2),
                            overlap_start: s1.max(s2),
                            overlap_end: f1.min(f2),
                        });
                    }
                }
            }
        }
    }
}

fn side(b: &Booking<'_>, start: NaiveDate, finish: NaiveDate) -> ConflictSide {
    ConflictSide {
        project_id: b.project.id.clone(),
        project_name: b.project.name.clone(),
        task_id: b.task.id.clone(),
        task_name: b.task.name.clone(),
        start,
        finish,
    }
}

/// Interval sweep over inclusive day windows.
fn peak_units(bookings: &[Booking<'_>]) -> f64 {
    let mut events: Vec<(NaiveDate, f64)> = bookings
        .iter()
        .filter_map(|b| b.window.map(|w| (w, b.units)))
        .flat_map(|((start, finish), units)| [(start, units), (shift(finish, 1), -units)])
        .collect();
    // Releases sort before bookings on the same day.
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut current = 0.0f64;
    let mut peak = 0.0f64;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak
}
