//! Critical Path Method scheduling.
//!
//! Computes early/late dates, total and free float, and the critical flag
//! for every task of a validated [`DependencyGraph`](crate::graph::DependencyGraph).
//!
//! # Algorithm
//!
//! `CpmScheduler` runs a forward pass in topological order and a backward
//! pass in reverse order over working-day offsets. Date constraints
//! (SNET, SNLT, FNET, FNLT, MSO, MFO) are honored in both passes.
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - PMI (2017), "Practice Standard for Scheduling", Ch. 4

mod cpm;

pub use cpm::{CpmScheduler, ProjectSchedule, ScheduledTask};
