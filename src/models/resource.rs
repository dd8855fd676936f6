//! Resource and assignment models.
//!
//! Resources are the people, equipment, and crews that perform tasks. An
//! assignment links one task to one resource with a quantity of units. A
//! resource may be assigned to tasks of several projects; that sharing is
//! what the conflict detector watches.

use serde::{Deserialize, Serialize};

/// A resource that can be assigned to tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Resource classification.
    #[serde(default)]
    pub resource_type: ResourceType,
    /// Units available simultaneously (default: 1).
    #[serde(default = "default_units")]
    pub max_units: f64,
}

/// Resource type classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Individual worker.
    #[default]
    Labor,
    /// Machine, vehicle, or tool.
    Equipment,
    /// A team scheduled as one unit.
    Crew,
    /// Domain-specific type.
    Custom(String),
}

impl ResourceType {
    /// Display label.
    pub fn label(&self) -> &str {
        match self {
            Self::Labor => "labor",
            Self::Equipment => "equipment",
            Self::Crew => "crew",
            Self::Custom(s) => s,
        }
    }
}

/// A task-resource link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: String,
    pub resource_id: String,
    /// Units consumed while the task runs (default: 1).
    #[serde(default = "default_units")]
    pub units: f64,
}

fn default_units() -> f64 {
    1.0
}

impl Resource {
    /// Creates a resource of the given type.
    pub fn new(id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            resource_type,
            max_units: 1.0,
        }
    }

    /// Creates a labor resource.
    pub fn labor(id: impl Into<String>) -> Self {
        Self::new(id, ResourceType::Labor)
    }

    /// Creates an equipment resource.
    pub fn equipment(id: impl Into<String>) -> Self {
        Self::new(id, ResourceType::Equipment)
    }

    /// Creates a crew resource.
    pub fn crew(id: impl Into<String>) -> Self {
        Self::new(id, ResourceType::Crew)
    }

    /// Sets the resource name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the concurrent unit capacity.
    pub fn with_max_units(mut self, max_units: f64) -> Self {
        self.max_units = max_units;
        self
    }
}

impl Assignment {
    /// Creates a one-unit assignment.
    pub fn new(task_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            resource_id: resource_id.into(),
            units: 1.0,
        }
    }

    /// Sets the units.
    pub fn with_units(mut self, units: f64) -> Self {
        self.units = units;
        self
    }
}
