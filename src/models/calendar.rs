//! Working-day calendar.
//!
//! Maps between calendar dates and working-day offsets. A calendar is a
//! weekday mask only; holiday and overtime exceptions are not modeled.
//!
//! # Offset Model
//! `add_work_days(d, n)` steps `n` working days away from `d`, and
//! `work_days_between(a, b)` counts the working days in `(a, b]` (negated
//! when `b < a`). For any working day `b`:
//! `add_work_days(a, work_days_between(a, b)) == b`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const ALL_DAYS: u8 = 0b111_1111;
const MON_TO_FRI: u8 = 0b001_1111;

/// Weekday-mask working calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// Bit 0 = Monday ... bit 6 = Sunday.
    work_days_mask: u8,
}

impl WorkCalendar {
    /// Every day is a working day.
    pub fn continuous() -> Self {
        Self {
            work_days_mask: ALL_DAYS,
        }
    }

    /// Monday through Friday.
    pub fn weekdays() -> Self {
        Self {
            work_days_mask: MON_TO_FRI,
        }
    }

    /// Creates a calendar from a raw mask. `None` if no day is a working day.
    pub fn from_mask(mask: u8) -> Option<Self> {
        let mask = mask & ALL_DAYS;
        (mask != 0).then_some(Self {
            work_days_mask: mask,
        })
    }

    /// Creates a calendar from a set of working weekdays.
    pub fn from_weekdays<I: IntoIterator<Item = Weekday>>(days: I) -> Option<Self> {
        let mask = days
            .into_iter()
            .fold(0u8, |m, d| m | (1 << d.num_days_from_monday()));
        Self::from_mask(mask)
    }

    /// The raw weekday mask.
    pub fn mask(&self) -> u8 {
        self.work_days_mask
    }

    fn is_continuous(&self) -> bool {
        self.work_days_mask == ALL_DAYS
    }

    /// Whether `date` is a working day.
    #[inline]
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        self.work_days_mask & (1 << date.weekday().num_days_from_monday()) != 0
    }

    /// Returns `date` if it is a working day, else the next working day.
    pub fn snap_forward(&self, date: NaiveDate) -> NaiveDate {
        let mut d = date;
        // A non-empty mask guarantees a hit within a week.
        for _ in 0..7 {
            if self.is_work_day(d) {
                return d;
            }
            d = shift(d, 1);
        }
        d
    }

    /// Steps `days` working days from `date`. Negative values step backward.
    pub fn add_work_days(&self, date: NaiveDate, days: i64) -> NaiveDate {
        if days == 0 {
            return date;
        }
        if self.is_continuous() {
            return shift(date, days);
        }
        let step = days.signum();
        let per_week = i64::from(self.work_days_mask.count_ones());
        // Any seven consecutive days hold exactly `per_week` working days.
        let full_weeks = (days.unsigned_abs() - 1) / per_week.unsigned_abs();
        let full_weeks = i64::try_from(full_weeks).unwrap_or(i64::MAX);
        let mut remaining = days.unsigned_abs() - full_weeks.unsigned_abs() * per_week.unsigned_abs();
        let mut d = shift(date, full_weeks.saturating_mul(7).saturating_mul(step));
        while remaining > 0 {
            let next = shift(d, step);
            if next == d {
                break;
            }
            d = next;
            if self.is_work_day(d) {
                remaining -= 1;
            }
        }
        d
    }

    /// Signed count of working days in `(start, end]`.
    pub fn work_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return -self.work_days_between(end, start);
        }
        let span = (end - start).num_days();
        if self.is_continuous() {
            return span;
        }
        let full_weeks = span / 7;
        let per_week = i64::from(self.work_days_mask.count_ones());
        let mut count = full_weeks * per_week;
        let mut d = shift(start, full_weeks * 7);
        while d < end {
            d = shift(d, 1);
            if self.is_work_day(d) {
                count += 1;
            }
        }
        count
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::continuous()
    }
}

/// Moves a date by whole calendar days, saturating at the representable range.
pub(crate) fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days > 0 {
            NaiveDate::MAX
        } else {
            NaiveDate::MIN
        })
}
