//! Engine configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty or
//! missing file yields [`EngineConfig::default`].
//!
//! ```toml
//! milestone_horizon_days = 14
//! max_parallelism = 4
//!
//! [health]
//! behind_float_days = -2
//! at_risk_float_days = 0
//!
//! [calendar]
//! work_days = ["mon", "tue", "wed", "thu", "fri"]
//! ```

use std::fs;
use std::path::Path;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::WorkCalendar;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How far ahead (calendar days) upcoming milestones are reported.
    #[serde(default = "default_milestone_horizon")]
    pub milestone_horizon_days: i64,

    /// Worker count for portfolio builds (None = CPU count).
    #[serde(default)]
    pub max_parallelism: Option<usize>,

    #[serde(default)]
    pub health: HealthThresholds,

    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Float thresholds for project health classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Minimum critical float below which a project is behind.
    #[serde(default = "default_behind_float")]
    pub behind_float_days: i64,

    /// Minimum critical float below which a project is at risk.
    #[serde(default)]
    pub at_risk_float_days: i64,
}

/// Working-week definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Weekday names ("mon", "tuesday", ...). Case-insensitive.
    #[serde(default = "default_work_days")]
    pub work_days: Vec<String>,
}

fn default_milestone_horizon() -> i64 {
    14
}

fn default_behind_float() -> i64 {
    -2
}

fn default_work_days() -> Vec<String> {
    ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            milestone_horizon_days: default_milestone_horizon(),
            max_parallelism: None,
            health: HealthThresholds::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            behind_float_days: default_behind_float(),
            at_risk_float_days: 0,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            work_days: default_work_days(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    /// Returns the default config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.milestone_horizon_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "milestone_horizon_days must be >= 0, got {}",
                self.milestone_horizon_days
            )));
        }
        if self.max_parallelism == Some(0) {
            return Err(ConfigError::Invalid(
                "max_parallelism must be >= 1".to_string(),
            ));
        }
        if self.health.behind_float_days > self.health.at_risk_float_days {
            return Err(ConfigError::Invalid(format!(
                "health.behind_float_days ({}) must not exceed health.at_risk_float_days ({})",
                self.health.behind_float_days, self.health.at_risk_float_days
            )));
        }
        self.calendar.to_calendar().map(|_| ())
    }

    /// Builds the working calendar.
    pub fn calendar(&self) -> Result<WorkCalendar, ConfigError> {
        self.calendar.to_calendar()
    }

    /// Worker count for portfolio builds.
    pub fn parallelism(&self) -> usize {
        self.max_parallelism.unwrap_or_else(num_cpus::get).max(1)
    }
}

impl CalendarConfig {
    /// Parses the weekday names into a [`WorkCalendar`].
    pub fn to_calendar(&self) -> Result<WorkCalendar, ConfigError> {
        let days = self
            .work_days
            .iter()
            .map(|name| {
                name.trim()
                    .parse::<Weekday>()
                    .map_err(|_| ConfigError::Invalid(format!("unknown weekday '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        WorkCalendar::from_weekdays(days)
            .ok_or_else(|| ConfigError::Invalid("calendar.work_days must not be empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.milestone_horizon_days, 14);
        assert_eq!(config.max_parallelism, None);
        assert_eq!(config.health.behind_float_days, -2);
        assert_eq!(config.health.at_risk_float_days, 0);
        assert_eq!(config.calendar().unwrap(), WorkCalendar::continuous());
        assert!(config.parallelism() >= 1);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_parallelism = 2

            [calendar]
            work_days = ["Mon", "tue", "wednesday", "thu", "fri"]
            "#,
        )
        .unwrap();
        assert_eq!(config.milestone_horizon_days, 14);
        assert_eq!(config.parallelism(), 2);
        assert_eq!(config.calendar().unwrap(), WorkCalendar::weekdays());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "milestone_horizon_days = -1",
            "max_parallelism = 0",
            "[health]\nbehind_float_days = 1\nat_risk_float_days = 0",
            "[calendar]\nwork_days = []",
            "[calendar]\nwork_days = [\"funday\"]",
        ] {
            let err = EngineConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{text}: {err}");
        }
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_toml_str("milestone_horizon_days = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "milestone_horizon_days = 30").unwrap();
        writeln!(file, "[health]").unwrap();
        writeln!(file, "behind_float_days = -5").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.milestone_horizon_days, 30);
        assert_eq!(config.health.behind_float_days, -5);
        assert_eq!(config.health.at_risk_float_days, 0);
    }
}
