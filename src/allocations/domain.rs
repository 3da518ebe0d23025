use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{AllocationId, DayOfWeekSet, PersonId, ScheduleId, TenantCode, TimeSlot};

/// Reason recorded when an allocation is auto-suspended off the back of an
/// external movement.
pub const AUTO_SUSPEND_MOVEMENT_REASON: &str = "Temporarily released or transferred";

/// Lifecycle status of an allocation. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Pending,
    Active,
    Suspended,
    SuspendedWithPay,
    AutoSuspended,
    Ended,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Suspended => "Suspended",
            Self::SuspendedWithPay => "Suspended with pay",
            Self::AutoSuspended => "Auto-suspended",
            Self::Ended => "Ended",
        }
    }

    pub const fn is_suspended(self) -> bool {
        matches!(
            self,
            Self::Suspended | Self::SuspendedWithPay | Self::AutoSuspended
        )
    }

    /// Total transition function: from-status plus event to new status, or a
    /// rejection. Any event against `Ended` is a terminal-state violation.
    pub fn transition(self, event: AllocationEvent) -> Result<Self, AllocationError> {
        use AllocationEvent::*;
        use AllocationStatus::*;

        if self == Ended {
            return Err(AllocationError::AlreadyEnded);
        }

        match (self, event) {
            (Pending, Activate) => Ok(Active),
            (Pending | Active, AutoSuspend) => Ok(AutoSuspended),
            (Active, Suspend { paid: false }) => Ok(Suspended),
            (Active, Suspend { paid: true }) => Ok(SuspendedWithPay),
            (Suspended | SuspendedWithPay, Unsuspend) => Ok(Active),
            (AutoSuspended, Reinstate) => Ok(Active),
            (_, Deallocate) => Ok(Ended),
            (from, event) => Err(AllocationError::InvalidTransition { from, event }),
        }
    }
}

/// Events driving the status state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationEvent {
    Activate,
    Suspend { paid: bool },
    Unsuspend,
    AutoSuspend,
    Reinstate,
    Deallocate,
}

/// Why an allocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeallocationReason {
    Ended,
    Withdrawn,
    TemporarilyReleased,
    Released,
    Other,
}

impl DeallocationReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ended => "Allocation end date reached",
            Self::Withdrawn => "Withdrawn by the establishment",
            Self::TemporarilyReleased => "Temporarily released or transferred",
            Self::Released => "Released from prison",
            Self::Other => "Other",
        }
    }
}

/// Stored future-or-current pause on one allocation.
///
/// `suspended_until` is the date the person resumes (exclusive); the
/// suspension is expired once `until <= today`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSuspension {
    pub suspended_from: NaiveDate,
    pub suspended_until: Option<NaiveDate>,
    pub paid: bool,
    pub case_note_id: Option<String>,
}

impl PlannedSuspension {
    pub fn in_force_on(&self, date: NaiveDate) -> bool {
        date >= self.suspended_from && self.suspended_until.is_none_or(|until| date < until)
    }

    pub fn expired_by(&self, date: NaiveDate) -> bool {
        self.suspended_until.is_some_and(|until| until <= date)
    }
}

/// Recurring per-slot opt-out: the person skips the named days of the given
/// week/time-slot from `start_date` until `end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotExclusion {
    pub week_number: u8,
    pub time_slot: TimeSlot,
    pub days: DayOfWeekSet,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// A scheduled end that has not yet been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDeallocation {
    pub reason: DeallocationReason,
    pub planned_on: NaiveDate,
}

/// One person's time-bounded enrolment in one activity schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub tenant: TenantCode,
    pub person_id: PersonId,
    pub schedule_id: ScheduleId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: AllocationStatus,
    pub planned_suspension: Option<PlannedSuspension>,
    pub exclusions: Vec<SlotExclusion>,
    pub planned_deallocation: Option<PlannedDeallocation>,
    pub deallocated_reason: Option<DeallocationReason>,
    pub deallocated_on: Option<NaiveDate>,
    /// Marker for auto-suspensions: the movement date and system reason.
    pub suspended_on: Option<NaiveDate>,
    pub suspended_reason: Option<String>,
}

impl Allocation {
    pub fn new(
        id: AllocationId,
        tenant: TenantCode,
        person_id: PersonId,
        schedule_id: ScheduleId,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, AllocationError> {
        if let Some(end) = end_date {
            if end < start_date {
                return Err(AllocationError::EndBeforeStart {
                    start: start_date,
                    end,
                });
            }
        }
        Ok(Self {
            id,
            tenant,
            person_id,
            schedule_id,
            start_date,
            end_date,
            status: AllocationStatus::Pending,
            planned_suspension: None,
            exclusions: Vec::new(),
            planned_deallocation: None,
            deallocated_reason: None,
            deallocated_on: None,
            suspended_on: None,
            suspended_reason: None,
        })
    }

    pub fn is_ended(&self) -> bool {
        self.status == AllocationStatus::Ended
    }

    fn guard_not_ended(&self) -> Result<(), AllocationError> {
        if self.is_ended() {
            return Err(AllocationError::AlreadyEnded);
        }
        Ok(())
    }

    /// A suspension counts while it has not yet run out, whether planned or
    /// already in force.
    pub fn has_live_suspension(&self, today: NaiveDate) -> bool {
        self.planned_suspension
            .as_ref()
            .is_some_and(|suspension| !suspension.expired_by(today))
    }

    /// Bring a pending allocation into force. When a planned suspension is
    /// already due the allocation activates straight into the suspended
    /// status rather than passing through `Active` attendance-side.
    pub fn activate(&mut self, today: NaiveDate) -> Result<(), AllocationError> {
        self.status = self.status.transition(AllocationEvent::Activate)?;
        if let Some(suspension) = self.planned_suspension.clone() {
            if suspension.in_force_on(today) {
                self.status = self.status.transition(AllocationEvent::Suspend {
                    paid: suspension.paid,
                })?;
            }
        }
        Ok(())
    }

    /// Pause driven by movement evidence; records the movement date and the
    /// fixed system reason.
    pub fn auto_suspend(&mut self, on: NaiveDate, reason: &str) -> Result<(), AllocationError> {
        self.status = self.status.transition(AllocationEvent::AutoSuspend)?;
        self.suspended_on = Some(on);
        self.suspended_reason = Some(reason.to_string());
        Ok(())
    }

    /// Reverse an auto-suspension once the person is back.
    pub fn reinstate(&mut self) -> Result<(), AllocationError> {
        self.status = self.status.transition(AllocationEvent::Reinstate)?;
        self.suspended_on = None;
        self.suspended_reason = None;
        Ok(())
    }

    /// Flip into the operator-suspended status matching the stored planned
    /// suspension.
    pub fn apply_suspension(&mut self) -> Result<(), AllocationError> {
        let paid = self
            .planned_suspension
            .as_ref()
            .ok_or(AllocationError::NotSuspended)?
            .paid;
        self.status = self.status.transition(AllocationEvent::Suspend { paid })?;
        Ok(())
    }

    /// Lift an in-force operator suspension, expiring its record at `today`.
    pub fn end_suspension(&mut self, today: NaiveDate) -> Result<(), AllocationError> {
        if self.planned_suspension.is_none() {
            return Err(AllocationError::NotSuspended);
        }
        self.status = self.status.transition(AllocationEvent::Unsuspend)?;
        if let Some(suspension) = self.planned_suspension.as_mut() {
            suspension.suspended_until = Some(today);
        }
        Ok(())
    }

    /// Terminal transition; records the reason and caps the end date.
    pub fn deallocate(
        &mut self,
        reason: DeallocationReason,
        on: NaiveDate,
    ) -> Result<(), AllocationError> {
        self.status = self.status.transition(AllocationEvent::Deallocate)?;
        self.deallocated_reason = Some(reason);
        self.deallocated_on = Some(on);
        self.end_date = Some(self.end_date.map_or(on, |end| end.min(on)));
        self.planned_deallocation = None;
        Ok(())
    }

    pub fn set_planned_deallocation(
        &mut self,
        reason: DeallocationReason,
        planned_on: NaiveDate,
    ) -> Result<(), AllocationError> {
        self.guard_not_ended()?;
        if planned_on < self.start_date {
            return Err(AllocationError::EndBeforeStart {
                start: self.start_date,
                end: planned_on,
            });
        }
        self.planned_deallocation = Some(PlannedDeallocation { reason, planned_on });
        Ok(())
    }

    /// Date-boundary sweep applied by the per-tenant evaluation job: bring
    /// due planned suspensions into force, lift suspensions whose resume
    /// date has arrived, and apply due planned deallocations. Idempotent:
    /// every decision re-derives from the stored records.
    pub fn apply_due_changes(&mut self, today: NaiveDate) -> Result<bool, AllocationError> {
        self.guard_not_ended()?;
        let mut changed = false;

        if let Some(planned) = self.planned_deallocation.clone() {
            if planned.planned_on <= today {
                self.deallocate(planned.reason, planned.planned_on)?;
                return Ok(true);
            }
        }

        match self.planned_suspension.clone() {
            Some(suspension)
                if self.status == AllocationStatus::Active && suspension.in_force_on(today) =>
            {
                self.apply_suspension()?;
                changed = true;
            }
            Some(suspension)
                if matches!(
                    self.status,
                    AllocationStatus::Suspended | AllocationStatus::SuspendedWithPay
                ) && suspension.expired_by(today) =>
            {
                self.status = self.status.transition(AllocationEvent::Unsuspend)?;
                changed = true;
            }
            _ => {}
        }

        Ok(changed)
    }
}

/// Domain errors raised by allocation transitions and validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("allocation has ended and can no longer change")]
    AlreadyEnded,
    #[error("cannot apply {event:?} to a {from:?} allocation")]
    InvalidTransition {
        from: AllocationStatus,
        event: AllocationEvent,
    },
    #[error("end date {end} falls before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("allocation is already suspended")]
    AlreadySuspended,
    #[error("allocation is not suspended")]
    NotSuspended,
    #[error("suspension date {date} is in the past")]
    SuspensionInPast { date: NaiveDate },
    #[error("date {date} falls after the allocation ends on {end}")]
    BeyondAllocationEnd { date: NaiveDate, end: NaiveDate },
    #[error("no slot matches week {week} {time_slot} for the excluded days")]
    NoMatchingSlot { week: u8, time_slot: &'static str },
}
