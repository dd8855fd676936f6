//! Read/write contract with the surrounding data store.
//!
//! The engine never holds state between runs: it reads a snapshot through
//! [`ScheduleStore`], computes, and writes schedule fields and EVM
//! snapshots back. [`InMemoryStore`] is the reference implementation.

use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::evm::EvmSnapshot;
use crate::models::{Assignment, Dependency, Project, Resource, Task};
use crate::scheduler::ProjectSchedule;

/// Source of portfolio records and sink for computed results.
pub trait ScheduleStore {
    /// All projects, archived ones included.
    fn projects(&self) -> Result<Vec<Project>, StoreError>;

    /// Tasks of one project, with their last written schedule.
    fn tasks(&self, project_id: &str) -> Result<Vec<Task>, StoreError>;

    /// Dependencies touching one project's tasks.
    fn dependencies(&self, project_id: &str) -> Result<Vec<Dependency>, StoreError>;

    fn resources(&self) -> Result<Vec<Resource>, StoreError>;

    fn assignments(&self) -> Result<Vec<Assignment>, StoreError>;

    /// Replaces the schedule fields of every task in the project.
    fn write_task_schedules(
        &mut self,
        project_id: &str,
        schedule: &ProjectSchedule,
    ) -> Result<(), StoreError>;

    /// Stores the project's latest EVM snapshot.
    fn write_evm_snapshot(&mut self, project_id: &str, snapshot: &EvmSnapshot)
        -> Result<(), StoreError>;
}

/// Vector-backed store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    projects: Vec<Project>,
    tasks: Vec<Task>,
    dependencies: Vec<Dependency>,
    resources: Vec<Resource>,
    assignments: Vec<Assignment>,
    evm_snapshots: HashMap<String, EvmSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn with_resources(mut self, resources: impl IntoIterator<Item = Resource>) -> Self {
        self.resources.extend(resources);
        self
    }

    pub fn with_assignments(mut self, assignments: impl IntoIterator<Item = Assignment>) -> Self {
        self.assignments.extend(assignments);
        self
    }

    /// Looks up a task by ID.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Every stored task.
    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Last EVM snapshot written for a project.
    pub fn evm_snapshot(&self, project_id: &str) -> Option<&EvmSnapshot> {
        self.evm_snapshots.get(project_id)
    }

    fn require_project(&self, project_id: &str) -> Result<(), StoreError> {
        if self.projects.iter().any(|p| p.id == project_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("project '{project_id}'")))
        }
    }
}

impl ScheduleStore for InMemoryStore {
    fn projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.projects.clone())
    }

    fn tasks(&self, project_id: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    fn dependencies(&self, project_id: &str) -> Result<Vec<Dependency>, StoreError> {
        let ids: HashSet<&str> = self
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id.as_str())
            .collect();
        Ok(self
            .dependencies
            .iter()
            .filter(|d| {
                ids.contains(d.predecessor_id.as_str()) || ids.contains(d.successor_id.as_str())
            })
            .cloned()
            .collect())
    }

    fn resources(&self) -> Result<Vec<Resource>, StoreError> {
        Ok(self.resources.clone())
    }

    fn assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.assignments.clone())
    }

    fn write_task_schedules(
        &mut self,
        project_id: &str,
        schedule: &ProjectSchedule,
    ) -> Result<(), StoreError> {
        self.require_project(project_id)?;
        for task in self.tasks.iter_mut().filter(|t| t.project_id == project_id) {
            task.schedule = schedule.get(&task.id).cloned();
        }
        Ok(())
    }

    fn write_evm_snapshot(
        &mut self,
        project_id: &str,
        snapshot: &EvmSnapshot,
    ) -> Result<(), StoreError> {
        self.require_project(project_id)?;
        self.evm_snapshots
            .insert(project_id.to_string(), snapshot.clone());
        Ok(())
    }
}
