//! Project model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    #[default]
    Active,
    OnHold,
    Completed,
    /// Excluded from portfolio analysis.
    Archived,
}

/// A project owning a set of tasks.
///
/// `planned_start` / `planned_finish` are informational; the schedule
/// computed by CPM is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    #[serde(default)]
    pub planned_finish: Option<NaiveDate>,
}

impl Project {
    /// Creates an active project.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            status: ProjectStatus::Active,
            planned_start: None,
            planned_finish: None,
        }
    }

    /// Sets the project name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the planned start.
    pub fn with_planned_start(mut self, date: NaiveDate) -> Self {
        self.planned_start = Some(date);
        self
    }

    /// Sets the planned finish.
    pub fn with_planned_finish(mut self, date: NaiveDate) -> Self {
        self.planned_finish = Some(date);
        self
    }

    /// Whether the project takes part in portfolio analysis.
    pub fn is_active(&self) -> bool {
        self.status != ProjectStatus::Archived
    }
}
