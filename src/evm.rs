//! Earned Value Management.
//!
//! Measures a project's cost and schedule performance against its budget
//! at a measurement date.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | BAC | Sum of budgeted cost |
//! | PV | Budget scheduled to be done by the measurement date |
//! | EV | Budget × percent complete |
//! | AC | Sum of actual cost |
//! | SPI | EV / PV (1 when PV = 0) |
//! | CPI | EV / AC (1 when AC = 0) |
//! | EAC | AC + (BAC − EV) / CPI (BAC when CPI ≤ 0) |
//! | ETC | max(EAC − AC, 0) |
//! | VAC | BAC − EAC |
//!
//! Every metric is always a number; zero denominators fall back to the
//! neutral values above. [`EarnedValue`] keeps full precision for further
//! aggregation; [`EvmSnapshot`] is the rounded display form.
//!
//! # Reference
//! PMI (2019), "The Standard for Earned Value Management"

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Warning, WarningKind};
use crate::models::{Task, WorkCalendar};

/// Unrounded EVM totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EarnedValue {
    /// Budget at completion.
    pub bac: f64,
    /// Planned value.
    pub pv: f64,
    /// Earned value.
    pub ev: f64,
    /// Actual cost.
    pub ac: f64,
}

/// EVM figures for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEarnedValue {
    pub task_id: String,
    pub value: EarnedValue,
}

/// EVM result for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEarnedValue {
    pub project_id: String,
    pub as_of: NaiveDate,
    pub tasks: Vec<TaskEarnedValue>,
    pub totals: EarnedValue,
    pub warnings: Vec<Warning>,
}

/// Rounded EVM figures for display and write-back.
///
/// Currency to cents, indices to two decimals, percentages to integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmSnapshot {
    pub bac: f64,
    pub ev: f64,
    pub pv: f64,
    pub ac: f64,
    pub spi: f64,
    pub cpi: f64,
    pub eac: f64,
    pub etc: f64,
    pub vac: f64,
    pub percent_complete: i64,
    pub percent_spent: i64,
}

impl EarnedValue {
    /// Schedule performance index.
    pub fn spi(&self) -> f64 {
        if self.pv > 0.0 {
            self.ev / self.pv
        } else {
            1.0
        }
    }

    /// Cost performance index.
    pub fn cpi(&self) -> f64 {
        if self.ac > 0.0 {
            self.ev / self.ac
        } else {
            1.0
        }
    }

    /// Estimate at completion.
    pub fn eac(&self) -> f64 {
        let cpi = self.cpi();
        if cpi > 0.0 {
            self.ac + (self.bac - self.ev) / cpi
        } else {
            self.bac
        }
    }

    /// Estimate to complete.
    pub fn etc(&self) -> f64 {
        (self.eac() - self.ac).max(0.0)
    }

    /// Variance at completion.
    pub fn vac(&self) -> f64 {
        self.bac - self.eac()
    }

    /// EV as a percentage of BAC (0 when BAC is 0).
    pub fn percent_complete(&self) -> f64 {
        if self.bac > 0.0 {
            self.ev / self.bac * 100.0
        } else {
            0.0
        }
    }

    /// AC as a percentage of BAC (0 when BAC is 0).
    pub fn percent_spent(&self) -> f64 {
        if self.bac > 0.0 {
            self.ac / self.bac * 100.0
        } else {
            0.0
        }
    }

    /// Adds another set of raw totals.
    pub fn accumulate(&mut self, other: &EarnedValue) {
        self.bac += other.bac;
        self.pv += other.pv;
        self.ev += other.ev;
        self.ac += other.ac;
    }

    /// Sums raw totals.
    pub fn sum<'a, I: IntoIterator<Item = &'a EarnedValue>>(values: I) -> Self {
        values.into_iter().fold(Self::default(), |mut acc, v| {
            acc.accumulate(v);
            acc
        })
    }

    /// Rounded display form.
    pub fn snapshot(&self) -> EvmSnapshot {
        EvmSnapshot {
            bac: round_cents(self.bac),
            ev: round_cents(self.ev),
            pv: round_cents(self.pv),
            ac: round_cents(self.ac),
            spi: round_cents(self.spi()),
            cpi: round_cents(self.cpi()),
            eac: round_cents(self.eac()),
            etc: round_cents(self.etc()),
            vac: round_cents(self.vac()),
            percent_complete: round_percent(self.percent_complete()),
            percent_spent: round_percent(self.percent_spent()),
        }
    }
}

/// Computes earned value at a measurement date.
#[derive(Debug, Clone)]
pub struct EvmCalculator {
    as_of: NaiveDate,
    calendar: WorkCalendar,
}

impl EvmCalculator {
    /// Creates a calculator measuring at `as_of` on a continuous calendar.
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            calendar: WorkCalendar::continuous(),
        }
    }

    /// Sets the calendar used to pro-rate planned value.
    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// EVM figures for one task.
    ///
    /// The planned window is the task's effective window: CPM early dates,
    /// falling back to the manual baseline. A task with no window has no
    /// planned value.
    pub fn task(&self, task: &Task) -> TaskEarnedValue {
        let budget = task.budgeted_cost;
        TaskEarnedValue {
            task_id: task.id.clone(),
            value: EarnedValue {
                bac: budget,
                pv: self.planned_value(task),
                ev: budget * task.progress() / 100.0,
                ac: task.actual_cost,
            },
        }
    }

    /// EVM figures for a project's tasks.
    pub fn project(&self, project_id: &str, tasks: &[Task]) -> ProjectEarnedValue {
        let mut warnings = Vec::new();
        let per_task: Vec<TaskEarnedValue> = tasks
            .iter()
            .map(|task| {
                if task.progress_out_of_range() {
                    warnings.push(Warning::new(
                        WarningKind::PercentOutOfRange,
                        task.id.clone(),
                        format!(
                            "Task '{}' reports {}% complete; clamped to 0-100",
                            task.id, task.percent_complete
                        ),
                    ));
                }
                self.task(task)
            })
            .collect();
        let totals = EarnedValue::sum(per_task.iter().map(|t| &t.value));

        tracing::debug!(
            project = project_id,
            bac = totals.bac,
            ev = totals.ev,
            pv = totals.pv,
            ac = totals.ac,
            "earned value computed"
        );

        ProjectEarnedValue {
            project_id: project_id.to_string(),
            as_of: self.as_of,
            tasks: per_task,
            totals,
            warnings,
        }
    }

    fn planned_value(&self, task: &Task) -> f64 {
        let budget = task.budgeted_cost;
        let Some((start, finish)) = task.effective_window() else {
            return 0.0;
        };
        if finish <= self.as_of {
            return budget;
        }
        if start > self.as_of {
            return 0.0;
        }
        let total = self.calendar.work_days_between(start, finish);
        if total <= 0 {
            return budget;
        }
        let elapsed = self
            .calendar
            .work_days_between(start, self.as_of)
            .clamp(0, total);
        budget * elapsed as f64 / total as f64
    }
}

/// Rounds to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds a percentage to an integer.
pub fn round_percent(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskSchedule;

    fn day(n: i64) -> NaiveDate {
        crate::models::shift(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), n)
    }

    fn task(id: &str, budget: f64, pct: f64, ac: f64, start: i64, finish: i64) -> Task {
        Task::new(id, "P")
            .with_budget(budget)
            .with_progress(pct)
            .with_actual_cost(ac)
            .with_planned(day(start), day(finish))
    }

    #[test]
    fn test_all_complete_on_budget() {
        let tasks = vec![
            task("A", 1000.0, 100.0, 1000.0, 0, 5),
            task("B", 500.0, 100.0, 500.0, 5, 8),
        ];
        let ev = EvmCalculator::new(day(10)).project("P", &tasks).totals;
        assert!((ev.bac - 1500.0).abs() < 1e-10);
        assert!((ev.ev - 1500.0).abs() < 1e-10);
        assert!((ev.pv - 1500.0).abs() < 1e-10);
        assert!((ev.ac - 1500.0).abs() < 1e-10);
        assert!((ev.spi() - 1.0).abs() < 1e-10);
        assert!((ev.cpi() - 1.0).abs() < 1e-10);
        assert!((ev.eac() - 1500.0).abs() < 1e-10);
        assert!(ev.vac().abs() < 1e-10);
        assert!(ev.etc().abs() < 1e-10);
    }

    #[test]
    fn test_planned_value_pro_rated() {
        let t = task("A", 1000.0, 0.0, 0.0, 0, 10);
        assert!((EvmCalculator::new(day(4)).task(&t).value.pv - 400.0).abs() < 1e-10);
        assert!((EvmCalculator::new(day(0)).task(&t).value.pv - 0.0).abs() < 1e-10);
        assert!((EvmCalculator::new(day(-1)).task(&t).value.pv - 0.0).abs() < 1e-10);
        assert!((EvmCalculator::new(day(10)).task(&t).value.pv - 1000.0).abs() < 1e-10);
    }

    #[test]
    fn test_planned_value_prefers_schedule() {
        let t = task("A", 100.0, 0.0, 0.0, 0, 10).with_schedule(TaskSchedule {
            early_start: day(20),
            early_finish: day(30),
            late_start: day(20),
            late_finish: day(30),
            total_float: 0,
            free_float: 0,
            is_critical: true,
            driving_predecessor: None,
        });
        assert_eq!(EvmCalculator::new(day(15)).task(&t).value.pv, 0.0);
        assert!((EvmCalculator::new(day(25)).task(&t).value.pv - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_no_window_no_planned_value() {
        let t = Task::new("A", "P").with_budget(100.0);
        assert_eq!(EvmCalculator::new(day(5)).task(&t).value.pv, 0.0);
    }

    #[test]
    fn test_milestone_planned_value_is_step() {
        let m = Task::milestone("M", "P")
            .with_budget(200.0)
            .with_planned(day(5), day(5));
        assert_eq!(EvmCalculator::new(day(4)).task(&m).value.pv, 0.0);
        assert_eq!(EvmCalculator::new(day(5)).task(&m).value.pv, 200.0);
    }

    #[test]
    fn test_zero_guards() {
        let ev = EarnedValue::default();
        assert_eq!(ev.spi(), 1.0);
        assert_eq!(ev.cpi(), 1.0);
        assert_eq!(ev.eac(), 0.0);
        assert_eq!(ev.percent_complete(), 0.0);
        assert_eq!(ev.percent_spent(), 0.0);

        // Nothing earned yet money spent: CPI = 0 so EAC falls back to BAC.
        let stalled = EarnedValue {
            bac: 1000.0,
            pv: 200.0,
            ev: 0.0,
            ac: 300.0,
        };
        assert_eq!(stalled.cpi(), 0.0);
        assert_eq!(stalled.eac(), 1000.0);
        assert_eq!(stalled.etc(), 700.0);
        assert_eq!(stalled.vac(), 0.0);
    }

    #[test]
    fn test_over_budget_forecast() {
        let ev = EarnedValue {
            bac: 1000.0,
            pv: 600.0,
            ev: 500.0,
            ac: 625.0,
        };
        assert!((ev.spi() - 500.0 / 600.0).abs() < 1e-10);
        assert!((ev.cpi() - 0.8).abs() < 1e-10);
        assert!((ev.eac() - 1250.0).abs() < 1e-10);
        assert!((ev.etc() - 625.0).abs() < 1e-10);
        assert!((ev.vac() + 250.0).abs() < 1e-10);
    }

    #[test]
    fn test_snapshot_rounding() {
        let ev = EarnedValue {
            bac: 300.0,
            pv: 100.0,
            ev: 100.004,
            ac: 33.333,
        };
        let snap = ev.snapshot();
        assert_eq!(snap.ev, 100.0);
        assert_eq!(snap.ac, 33.33);
        assert_eq!(snap.percent_complete, 33);
        assert_eq!(snap.percent_spent, 11);
        assert_eq!(snap.spi, 1.0);
        assert_eq!(snap.cpi, 3.0);
    }

    #[test]
    fn test_sum_uses_raw_values() {
        let parts = [
            EarnedValue {
                bac: 0.004,
                pv: 0.0,
                ev: 0.004,
                ac: 0.0,
            };
            3
        ];
        let total = EarnedValue::sum(parts.iter());
        // Rounding each part first would give 0.00.
        assert_eq!(total.snapshot().bac, 0.01);
    }

    #[test]
    fn test_percent_out_of_range_warns_and_clamps() {
        let tasks = vec![task("A", 100.0, 150.0, 0.0, 0, 1)];
        let result = EvmCalculator::new(day(5)).project("P", &tasks);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::PercentOutOfRange);
        assert!((result.totals.ev - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_weekday_pro_rating() {
        // Mon 2024-01-01 .. Mon 2024-01-08 spans 5 working days.
        let t = Task::new("A", "P")
            .with_budget(500.0)
            .with_planned(day(0), day(7));
        let calc = EvmCalculator::new(day(5)).with_calendar(WorkCalendar::weekdays());
        // Sat 2024-01-06: 4 working days elapsed (Tue..Fri).
        assert!((calc.task(&t).value.pv - 400.0).abs() < 1e-10);
    }
}
