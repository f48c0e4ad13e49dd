//! Rebalance scheduling.
//!
//! The scheduler fires on the first bar seen in a new period and never twice
//! within one period, however many bars (or instruments) arrive in it.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Maps a calendar day to the period it belongs to.
pub trait PeriodCalendar {
    /// Two days share a period iff their keys are equal; keys increase with time.
    fn period_of(&self, date: NaiveDate) -> (i32, u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Periodicity {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl PeriodCalendar for Periodicity {
    fn period_of(&self, date: NaiveDate) -> (i32, u32) {
        match self {
            Periodicity::Daily => (date.year(), date.ordinal()),
            Periodicity::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Periodicity::Monthly => (date.year(), date.month()),
            Periodicity::Quarterly => (date.year(), date.month0() / 3),
        }
    }
}

impl FromStr for Periodicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Periodicity::Daily),
            "weekly" => Ok(Periodicity::Weekly),
            "monthly" => Ok(Periodicity::Monthly),
            "quarterly" => Ok(Periodicity::Quarterly),
            other => Err(format!(
                "unknown periodicity '{other}', expected daily, weekly, monthly or quarterly"
            )),
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Periodicity::Daily => "daily",
            Periodicity::Weekly => "weekly",
            Periodicity::Monthly => "monthly",
            Periodicity::Quarterly => "quarterly",
        };
        write!(f, "{s}")
    }
}

pub struct RebalanceScheduler {
    calendar: Box<dyn PeriodCalendar>,
    last_trigger: Option<NaiveDate>,
}

impl RebalanceScheduler {
    pub fn new(periodicity: Periodicity) -> Self {
        Self::with_calendar(Box::new(periodicity))
    }

    pub fn with_calendar(calendar: Box<dyn PeriodCalendar>) -> Self {
        RebalanceScheduler {
            calendar,
            last_trigger: None,
        }
    }

    pub fn last_trigger(&self) -> Option<NaiveDate> {
        self.last_trigger
    }

    /// True the first time a bar from a not-yet-triggered period is seen.
    pub fn should_trigger(&mut self, timestamp: NaiveDateTime) -> bool {
        let day = timestamp.date();
        if let Some(last) = self.last_trigger {
            if day <= last || self.calendar.period_of(day) == self.calendar.period_of(last) {
                return false;
            }
        }
        self.last_trigger = Some(day);
        true
    }
}

impl fmt::Debug for RebalanceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebalanceScheduler")
            .field("last_trigger", &self.last_trigger)
            .finish_non_exhaustive()
    }
}
