//! Reporting-period clock.
//!
//! The daily tier keys rows by the reporting date, not the wall-clock date:
//! the business day rolls at the configured cutoff hour (23:00), so writes
//! landing between 23:00 and midnight belong to the next calendar day.
//! Injectable so tests can pin the period date.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone)]
pub enum ReportingClock {
    /// Production: local wall clock with the daily cutoff applied.
    Wall { cutoff_hour: u32 },
    /// Tests: a fixed reporting date.
    Fixed(NaiveDate),
}

impl ReportingClock {
    pub fn wall(cutoff_hour: u32) -> Self {
        Self::Wall { cutoff_hour }
    }

    pub fn fixed(date: NaiveDate) -> Self {
        Self::Fixed(date)
    }

    /// The date the current reporting period belongs to.
    pub fn reporting_date(&self) -> NaiveDate {
        match self {
            Self::Wall { cutoff_hour } => {
                period_date(Local::now().naive_local(), *cutoff_hour)
            }
            Self::Fixed(date) => *date,
        }
    }
}

fn period_date(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    use chrono::Timelike;
    if now.hour() >= cutoff_hour {
        now.date() + Duration::days(1)
    } else {
        now.date()
    }
}
