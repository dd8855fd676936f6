//! Precedence links between tasks.
//!
//! # Relation Types
//!
//! | Kind | Constraint |
//! |------|-----------|
//! | FS | successor starts after predecessor finishes + lag |
//! | SS | successor starts after predecessor starts + lag |
//! | FF | successor finishes after predecessor finishes + lag |
//! | SF | successor finishes after predecessor starts + lag |
//!
//! A negative lag is a lead.

use serde::{Deserialize, Serialize};

/// Relation type of a dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    #[default]
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

impl DependencyKind {
    /// Short code (`FS`, `SS`, `FF`, `SF`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }
}

/// A directed edge `predecessor -> successor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor_id: String,
    pub successor_id: String,
    #[serde(default)]
    pub kind: DependencyKind,
    /// Lag in working days. Negative = lead.
    #[serde(default)]
    pub lag_days: i64,
}

impl Dependency {
    /// Creates a dependency of the given kind with zero lag.
    pub fn new(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        kind: DependencyKind,
    ) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            kind,
            lag_days: 0,
        }
    }

    /// Finish-to-start with zero lag.
    pub fn finish_to_start(predecessor_id: impl Into<String>, successor_id: impl Into<String>) -> Self {
        Self::new(predecessor_id, successor_id, DependencyKind::FinishToStart)
    }

    /// Sets the lag (negative for lead time).
    pub fn with_lag(mut self, lag_days: i64) -> Self {
        self.lag_days = lag_days;
        self
    }
}
