//! Clock and holiday-calendar ports.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{Local, NaiveDate};

/// Source of "today" so services stay testable against fixed dates.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation used by the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Fixed-date clock for tests and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Answers whether a date is a recognized holiday for a jurisdiction.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate, jurisdiction: &str) -> bool;
}

/// In-memory calendar keyed by jurisdiction, for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidayCalendar {
    holidays: BTreeMap<String, BTreeSet<NaiveDate>>,
}

impl StaticHolidayCalendar {
    pub fn with_holidays(jurisdiction: &str, dates: &[NaiveDate]) -> Self {
        let mut calendar = Self::default();
        calendar.add(jurisdiction, dates);
        calendar
    }

    pub fn add(&mut self, jurisdiction: &str, dates: &[NaiveDate]) {
        self.holidays
            .entry(jurisdiction.to_string())
            .or_default()
            .extend(dates.iter().copied());
    }
}

impl HolidayCalendar for StaticHolidayCalendar {
    fn is_holiday(&self, date: NaiveDate, jurisdiction: &str) -> bool {
        self.holidays
            .get(jurisdiction)
            .is_some_and(|dates| dates.contains(&date))
    }
}
