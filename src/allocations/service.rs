use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::calendar::Clock;
use crate::domain::AllocationId;
use crate::repository::RepositoryError;
use crate::schedules::repository::ScheduleRepository;

use super::domain::{
    Allocation, AllocationError, AllocationEvent, AllocationStatus, PlannedSuspension,
    SlotExclusion,
};
use super::repository::{
    AllocationRepository, AttendanceUpdates, CaseNoteClient, CaseNoteError, CaseNoteRequest,
};

/// Operator-facing engine for suspensions, unsuspensions, and recurring
/// slot exclusions. Validates every allocation in a batch before mutating
/// any of them, so a validation error leaves no state behind.
pub struct AllocationService<R, S, C, A> {
    allocations: Arc<R>,
    schedules: Arc<S>,
    case_notes: Arc<C>,
    attendance: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<R, S, C, A> AllocationService<R, S, C, A>
where
    R: AllocationRepository + 'static,
    S: ScheduleRepository + 'static,
    C: CaseNoteClient + 'static,
    A: AttendanceUpdates + 'static,
{
    pub fn new(
        allocations: Arc<R>,
        schedules: Arc<S>,
        case_notes: Arc<C>,
        attendance: Arc<A>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            allocations,
            schedules,
            case_notes,
            attendance,
            clock,
        }
    }

    /// Suspend the given allocations from `from`, immediately when `from`
    /// is today, otherwise as a planned suspension for the fan-out path to
    /// apply. Pending allocations pin the suspension to their own start
    /// date. A supplied case-note request is posted per allocation and its
    /// id stored on the suspension.
    pub fn suspend(
        &self,
        allocation_ids: &[AllocationId],
        from: NaiveDate,
        paid: bool,
        case_note: Option<&CaseNoteRequest>,
    ) -> Result<Vec<Allocation>, AllocationServiceError> {
        let today = self.clock.today();
        if from < today {
            return Err(AllocationError::SuspensionInPast { date: from }.into());
        }

        let mut loaded = self.load_all(allocation_ids)?;
        for allocation in &loaded {
            if allocation.is_ended() {
                return Err(AllocationError::AlreadyEnded.into());
            }
            if allocation.has_live_suspension(today) {
                return Err(AllocationError::AlreadySuspended.into());
            }
            if let Some(end) = allocation.end_date {
                if from > end {
                    return Err(AllocationError::BeyondAllocationEnd { date: from, end }.into());
                }
            }
        }

        let mut updated = Vec::with_capacity(loaded.len());
        for allocation in loaded.iter_mut() {
            let effective_from = if allocation.status == AllocationStatus::Pending {
                allocation.start_date
            } else {
                from
            };

            let case_note_id = match case_note {
                Some(request) => Some(self.case_notes.post_case_note(
                    &allocation.tenant,
                    &allocation.person_id,
                    request,
                )?),
                None => None,
            };

            allocation.planned_suspension = Some(PlannedSuspension {
                suspended_from: effective_from,
                suspended_until: None,
                paid,
                case_note_id,
            });

            let immediate =
                allocation.status == AllocationStatus::Active && effective_from <= today;
            if immediate {
                allocation.apply_suspension()?;
                self.attendance
                    .suspend_future_attendance(allocation, effective_from, paid);
            }

            info!(
                allocation = allocation.id.0,
                from = %effective_from,
                paid,
                immediate,
                "suspension recorded"
            );

            self.allocations.save(allocation.clone())?;
            updated.push(allocation.clone());
        }

        Ok(updated)
    }

    /// Lift or shorten the given allocations' suspensions. A resume date on
    /// or before the allocation's own start erases the suspension without
    /// trace; a resume date that has already arrived takes effect now;
    /// anything later is simply recorded for the fan-out path.
    pub fn unsuspend(
        &self,
        allocation_ids: &[AllocationId],
        until: NaiveDate,
    ) -> Result<Vec<Allocation>, AllocationServiceError> {
        let today = self.clock.today();

        let mut loaded = self.load_all(allocation_ids)?;
        for allocation in &loaded {
            if allocation.is_ended() {
                return Err(AllocationError::AlreadyEnded.into());
            }
            if allocation.planned_suspension.is_none() {
                return Err(AllocationError::NotSuspended.into());
            }
            if let Some(end) = allocation.end_date {
                if until > end {
                    return Err(AllocationError::BeyondAllocationEnd { date: until, end }.into());
                }
            }
        }

        let mut updated = Vec::with_capacity(loaded.len());
        for allocation in loaded.iter_mut() {
            let was_suspended = matches!(
                allocation.status,
                AllocationStatus::Suspended | AllocationStatus::SuspendedWithPay
            );

            if until <= allocation.start_date {
                // Never took effect (or is being cancelled back to its
                // start): remove every trace.
                allocation.planned_suspension = None;
                if was_suspended {
                    allocation.status = allocation.status.transition(AllocationEvent::Unsuspend)?;
                    self.attendance
                        .reinstate_future_attendance(allocation, today);
                }
            } else if until <= today {
                if was_suspended {
                    allocation.end_suspension(until)?;
                    self.attendance
                        .reinstate_future_attendance(allocation, until);
                } else {
                    // Planned but not yet in force, and the resume date has
                    // already passed: it can never apply.
                    allocation.planned_suspension = None;
                }
            } else if let Some(suspension) = allocation.planned_suspension.as_mut() {
                suspension.suspended_until = Some(until);
            }

            info!(allocation = allocation.id.0, until = %until, "unsuspension recorded");

            self.allocations.save(allocation.clone())?;
            updated.push(allocation.clone());
        }

        Ok(updated)
    }

    /// Replace the allocation's exclusion set with exactly `exclusions`,
    /// pinning each entry's start date to `effective_date`. Every entry must
    /// match a slot of the owning schedule (same week and time-of-day, day
    /// subset) or the whole request is rejected.
    pub fn update_exclusions(
        &self,
        allocation_id: AllocationId,
        exclusions: Vec<SlotExclusion>,
        effective_date: NaiveDate,
    ) -> Result<Allocation, AllocationServiceError> {
        let mut allocation = self
            .allocations
            .find(allocation_id)?
            .ok_or(RepositoryError::NotFound)?;
        if allocation.is_ended() {
            return Err(AllocationError::AlreadyEnded.into());
        }

        let schedule = self
            .schedules
            .find(allocation.schedule_id)?
            .ok_or(RepositoryError::NotFound)?;

        let mut replacement = Vec::with_capacity(exclusions.len());
        for mut exclusion in exclusions {
            if schedule
                .matching_slot(exclusion.week_number, exclusion.time_slot, exclusion.days)
                .is_none()
            {
                return Err(AllocationError::NoMatchingSlot {
                    week: exclusion.week_number,
                    time_slot: exclusion.time_slot.label(),
                }
                .into());
            }
            exclusion.start_date = effective_date;
            replacement.push(exclusion);
        }

        info!(
            allocation = allocation.id.0,
            exclusions = replacement.len(),
            "exclusion set replaced"
        );

        allocation.exclusions = replacement;
        self.allocations.save(allocation.clone())?;
        Ok(allocation)
    }

    fn load_all(&self, ids: &[AllocationId]) -> Result<Vec<Allocation>, AllocationServiceError> {
        let loaded = self.allocations.find_many(ids)?;
        if loaded.len() != ids.len() {
            return Err(RepositoryError::NotFound.into());
        }
        Ok(loaded)
    }
}

/// Error raised by the suspension and exclusion engine.
#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error(transparent)]
    Domain(#[from] AllocationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    CaseNote(#[from] CaseNoteError),
}
