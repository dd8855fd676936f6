//! Project scheduling analytics.
//!
//! Computes project timelines with the Critical Path Method, tracks cost and
//! schedule performance with Earned Value Management, and detects resource
//! double-booking across a portfolio of concurrently running projects.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Project`, `Task`, `Dependency`, `Resource`,
//!   `Assignment`, `WorkCalendar`
//! - **`graph`**: Dependency graph validation and topological ordering
//! - **`scheduler`**: CPM forward/backward passes, float, critical path
//! - **`evm`**: Earned value metrics (PV, EV, AC, SPI, CPI, EAC, ETC, VAC)
//! - **`conflict`**: Cross-project resource conflicts and utilization
//! - **`portfolio`**: Project health, milestones, portfolio report
//! - **`engine`**: Per-project pipeline and parallel portfolio builds
//! - **`store`**: Read/write contract with the surrounding data store
//! - **`config`**, **`telemetry`**, **`error`**: Configuration, logging,
//!   error taxonomy
//!
//! # Architecture
//!
//! The engine is stateless. Each invocation reads a snapshot through
//! [`store::ScheduleStore`], computes, and writes results back. Inputs are
//! never mutated in place.
//!
//! ```text
//! graph -> scheduler -> evm ─┐
//!        (per project)       ├─> portfolio
//!                 conflict ──┘
//! ```
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - PMI (2019), "The Standard for Earned Value Management"

pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod evm;
pub mod graph;
pub mod models;
pub mod portfolio;
pub mod scheduler;
pub mod store;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{build_portfolio_report, recompute_project, CancellationToken, PortfolioEngine};
pub use error::{ScheduleError, Warning, WarningKind};
pub use portfolio::PortfolioReport;
pub use store::{InMemoryStore, ScheduleStore};
