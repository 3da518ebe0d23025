use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::{DayOfWeekSet, ScheduleId, TenantCode, TimeSlot};

/// Recurring weekly pattern entry for a schedule.
///
/// `week_number` is 1-based and only meaningful for multi-week schedules
/// (`schedule_weeks > 1`); single-week schedules use week 1 throughout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub week_number: u8,
    pub time_slot: TimeSlot,
    pub days: DayOfWeekSet,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
}

/// One concrete dated occurrence of a slot.
///
/// Identity within a schedule is `(session_date, time_slot)`; the
/// materializer never creates a second instance for the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInstance {
    pub session_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    /// Whether a schedule-level suspension covered the date when the
    /// instance was created. Suspension is an attendance concern, so it is
    /// recorded here rather than blocking creation.
    pub suspended: bool,
    pub cancelled: bool,
}

/// Date-ranged pause on a whole schedule. `suspended_until` is the first day
/// the schedule runs again (exclusive); open-ended when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSuspension {
    pub suspended_from: NaiveDate,
    pub suspended_until: Option<NaiveDate>,
}

impl ScheduleSuspension {
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.suspended_from && self.suspended_until.is_none_or(|until| date < until)
    }
}

/// Aggregate root owning slots, materialized instances, and suspensions for
/// one activity at one tenant. Allocations reference it by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySchedule {
    pub id: ScheduleId,
    pub tenant: TenantCode,
    pub activity_summary: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Length of the repeating cycle in weeks, at least 1.
    pub schedule_weeks: u8,
    pub runs_on_holidays: bool,
    pub slots: Vec<ScheduleSlot>,
    pub instances: Vec<SessionInstance>,
    pub suspensions: Vec<ScheduleSuspension>,
}

impl ActivitySchedule {
    /// Which week of the repeating cycle `date` falls in (1-based), or
    /// `None` when the date lies outside the schedule's date range.
    pub fn cycle_week_for(&self, date: NaiveDate) -> Option<u8> {
        if date < self.start_date {
            return None;
        }
        if self.end_date.is_some_and(|end| date > end) {
            return None;
        }
        let elapsed_days = (date - self.start_date).num_days();
        let week = (elapsed_days / 7) % i64::from(self.schedule_weeks.max(1));
        Some(week as u8 + 1)
    }

    /// Slots that run on `date` given its weekday and cycle week.
    pub fn slots_for(&self, date: NaiveDate) -> Vec<&ScheduleSlot> {
        let Some(week) = self.cycle_week_for(date) else {
            return Vec::new();
        };
        self.slots
            .iter()
            .filter(|slot| slot.week_number == week && slot.days.contains(date.weekday()))
            .collect()
    }

    pub fn has_instance(&self, date: NaiveDate, time_slot: TimeSlot) -> bool {
        self.instances
            .iter()
            .any(|instance| instance.session_date == date && instance.time_slot == time_slot)
    }

    pub fn suspended_on(&self, date: NaiveDate) -> bool {
        self.suspensions.iter().any(|s| s.covers(date))
    }

    /// A slot matching an exclusion's `(week, time_slot)` whose day set
    /// contains all of the excluded days, if any exists.
    pub fn matching_slot(
        &self,
        week_number: u8,
        time_slot: TimeSlot,
        days: DayOfWeekSet,
    ) -> Option<&ScheduleSlot> {
        self.slots.iter().find(|slot| {
            slot.week_number == week_number
                && slot.time_slot == time_slot
                && days.is_subset(slot.days)
        })
    }
}

/// Validation errors raised by schedule construction and queries.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule must repeat over at least one week")]
    EmptyCycle,
    #[error("slot week {week} exceeds the {cycle}-week cycle")]
    SlotOutsideCycle { week: u8, cycle: u8 },
}

impl ActivitySchedule {
    /// Checks the slot set against the declared cycle length.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.schedule_weeks == 0 {
            return Err(ScheduleError::EmptyCycle);
        }
        for slot in &self.slots {
            if slot.week_number == 0 || slot.week_number > self.schedule_weeks {
                return Err(ScheduleError::SlotOutsideCycle {
                    week: slot.week_number,
                    cycle: self.schedule_weeks,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn monday_schedule(schedule_weeks: u8) -> ActivitySchedule {
        ActivitySchedule {
            id: ScheduleId(1),
            tenant: TenantCode::new("PVI"),
            activity_summary: "Woodwork".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).expect("a Monday"),
            end_date: None,
            schedule_weeks,
            runs_on_holidays: false,
            slots: vec![ScheduleSlot {
                week_number: 1,
                time_slot: TimeSlot::Am,
                days: DayOfWeekSet::from_days(&[Weekday::Mon]),
                starts_at: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
                ends_at: NaiveTime::from_hms_opt(11, 30, 0).expect("valid time"),
            }],
            instances: Vec::new(),
            suspensions: Vec::new(),
        }
    }

    #[test]
    fn cycle_week_wraps_over_multi_week_patterns() {
        let schedule = monday_schedule(2);
        let start = schedule.start_date;

        assert_eq!(schedule.cycle_week_for(start), Some(1));
        assert_eq!(schedule.cycle_week_for(start + chrono::Duration::days(6)), Some(1));
        assert_eq!(schedule.cycle_week_for(start + chrono::Duration::days(7)), Some(2));
        assert_eq!(schedule.cycle_week_for(start + chrono::Duration::days(14)), Some(1));
        assert_eq!(schedule.cycle_week_for(start - chrono::Duration::days(1)), None);
    }

    #[test]
    fn slots_for_requires_matching_weekday_and_cycle_week() {
        let schedule = monday_schedule(2);
        let first_monday = schedule.start_date;
        let second_monday = first_monday + chrono::Duration::days(7);

        assert_eq!(schedule.slots_for(first_monday).len(), 1);
        // Week 2 has no slots, so the second Monday runs nothing.
        assert!(schedule.slots_for(second_monday).is_empty());
        assert!(schedule
            .slots_for(first_monday + chrono::Duration::days(1))
            .is_empty());
    }

    #[test]
    fn suspension_cover_is_inclusive_from_exclusive_until() {
        let from = NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date");
        let until = NaiveDate::from_ymd_opt(2025, 9, 15).expect("valid date");
        let suspension = ScheduleSuspension {
            suspended_from: from,
            suspended_until: Some(until),
        };

        assert!(suspension.covers(from));
        assert!(suspension.covers(until - chrono::Duration::days(1)));
        assert!(!suspension.covers(until));
        assert!(!suspension.covers(from - chrono::Duration::days(1)));
    }

    #[test]
    fn validate_rejects_slot_outside_cycle() {
        let mut schedule = monday_schedule(1);
        schedule.slots[0].week_number = 2;
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::SlotOutsideCycle { week: 2, cycle: 1 })
        ));
    }
}
