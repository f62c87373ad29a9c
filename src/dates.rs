//! Calendar-window arithmetic for reports.
//!
//! All range math happens on `NaiveDate` so a viewer's timezone can never
//! shift a period boundary by a day. Dates cross the wire as `YYYY-MM-DD`.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};

/// id-ID short month names, for chart labels.
const MONTHS_SHORT_ID: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// Inclusive calendar-day reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidRange(format!("{end} is before {start}")));
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// The `n` days ending on `today`, inclusive.
    pub fn last_n_days(today: NaiveDate, n: u32) -> Self {
        let span = n.max(1) as i64;
        Self {
            start: today - Duration::days(span - 1),
            end: today,
        }
    }

    /// First of the month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: today.with_day(1).unwrap_or(today),
            end: today,
        }
    }

    /// Number of calendar days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The immediately preceding window of equal length. Never overlaps:
    /// its end is the day before this window starts.
    pub fn previous(&self) -> ReportRange {
        let end = self.start - Duration::days(1);
        ReportRange {
            start: end - Duration::days(self.days() - 1),
            end,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Every day in the window, ascending.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |d| {
            let next = *d + Duration::days(1);
            (next <= end).then_some(next)
        })
    }
}

/// Short id-ID chart label, e.g. `5 Agu`.
pub fn short_label(day: NaiveDate) -> String {
    format!("{} {}", day.day(), MONTHS_SHORT_ID[day.month0() as usize])
}

// ===========================================================================
// Tests
// ===========================================================================
