//! Error and warning types.
//!
//! Two tiers:
//! - [`ScheduleError`] aborts one project's run. No partial schedule is
//!   produced and nothing is written back.
//! - [`Warning`] records a degraded continuation. The run still returns a
//!   best-effort result with the warnings alongside it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a project run or a portfolio build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The dependency graph contains a cycle.
    #[error("circular dependency in project '{project_id}': {}", .cycle.join(" -> "))]
    CyclicDependency {
        project_id: String,
        /// Every task that could not be topologically ordered.
        task_ids: Vec<String>,
        /// One concrete cycle, first task repeated at the end.
        cycle: Vec<String>,
    },
    /// Two tasks share an id.
    #[error("duplicate task id '{task_id}' in project '{project_id}'")]
    DuplicateTask { project_id: String, task_id: String },
    /// A task was passed in with a different project.
    #[error("task '{task_id}' belongs to project '{actual}', not '{expected}'")]
    ForeignTask {
        task_id: String,
        expected: String,
        actual: String,
    },
    /// The requested project does not exist.
    #[error("project '{0}' not found")]
    MissingProject(String),
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The engine configuration is unusable.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    /// The run was cancelled between project computations.
    #[error("portfolio build cancelled")]
    Cancelled,
}

impl From<ConfigError> for ScheduleError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl ScheduleError {
    /// Whether this error comes from the project's task graph.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency { .. } | Self::DuplicateTask { .. } | Self::ForeignTask { .. }
        )
    }
}

/// Errors raised by a [`ScheduleStore`](crate::store::ScheduleStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors raised while loading [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Categories of non-fatal problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Negative duration; scheduled as zero.
    InvalidDuration,
    /// Dependency endpoint missing or duplicated; edge dropped.
    InvalidDependency,
    /// Assignment references a resource that doesn't exist.
    MissingResource,
    /// Task references a project that doesn't exist.
    MissingProject,
    /// Assignment references a task that doesn't exist.
    MissingTask,
    /// Percent complete outside 0-100; clamped.
    PercentOutOfRange,
}

/// A non-fatal problem reported next to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Related entity (task, dependency, or assignment description).
    pub entity_id: String,
    pub message: String,
}

impl Warning {
    /// Creates a warning and logs it.
    pub fn new(kind: WarningKind, entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        let warning = Self {
            kind,
            entity_id: entity_id.into(),
            message: message.into(),
        };
        tracing::warn!(kind = ?warning.kind, entity = %warning.entity_id, "{}", warning.message);
        warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let err = ScheduleError::CyclicDependency {
            project_id: "P1".into(),
            task_ids: vec!["A".into(), "B".into()],
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency in project 'P1': A -> B -> A"
        );
        assert!(err.is_graph_error());
    }

    #[test]
    fn test_store_error_converts() {
        let err: ScheduleError = StoreError::Backend("timeout".into()).into();
        assert_eq!(err.to_string(), "store backend error: timeout");
        assert!(!err.is_graph_error());
    }

    #[test]
    fn test_config_error_converts() {
        let err: ScheduleError = ConfigError::Invalid("max_parallelism must be >= 1".into()).into();
        assert_eq!(
            err.to_string(),
            "invalid engine config: invalid config: max_parallelism must be >= 1"
        );
    }

    #[test]
    fn test_warning_fields() {
        let w = Warning::new(WarningKind::InvalidDuration, "T1", "negative duration");
        assert_eq!(w.kind, WarningKind::InvalidDuration);
        assert_eq!(w.entity_id, "T1");
    }
}
