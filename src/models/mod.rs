//! Project scheduling domain models.
//!
//! Strongly typed records for the data the engine reads from the external
//! store. Missing numeric fields default to zero (units default to one) at
//! construction or deserialization.
//!
//! # Domain Mappings
//!
//! | u-project | Construction | Service |
//! |-----------|--------------|---------|
//! | Project | Job | Engagement |
//! | Task | Scope item | Work package |
//! | Resource | Crew / Equipment | Technician |
//! | Assignment | Crew booking | Dispatch |

mod calendar;
mod dependency;
mod project;
mod resource;
mod task;

pub use calendar::WorkCalendar;
pub(crate) use calendar::shift;
pub use dependency::{Dependency, DependencyKind};
pub use project::{Project, ProjectStatus};
pub use resource::{Assignment, Resource, ResourceType};
pub use task::{ConstraintKind, DateConstraint, Task, TaskSchedule, TaskType};
