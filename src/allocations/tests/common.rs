use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Weekday};

use crate::allocations::domain::Allocation;
use crate::allocations::repository::{
    AllocationRepository, AttendanceUpdates, CaseNoteClient, CaseNoteError, CaseNoteRequest,
};
use crate::allocations::service::AllocationService;
use crate::allocations::AllocationStatus;
use crate::calendar::FixedClock;
use crate::domain::{
    AllocationId, DayOfWeekSet, PersonId, ScheduleId, TenantCode, TimeSlot,
};
use crate::repository::RepositoryError;
use crate::schedules::domain::{ActivitySchedule, ScheduleSlot};
use crate::schedules::repository::ScheduleRepository;

pub(super) fn today() -> NaiveDate {
    // A Monday.
    NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date")
}

pub(super) fn tenant() -> TenantCode {
    TenantCode::new("PVI")
}

#[derive(Default)]
pub(super) struct MemoryAllocations {
    records: Mutex<BTreeMap<AllocationId, Allocation>>,
}

impl MemoryAllocations {
    pub(super) fn seed(&self, allocation: Allocation) {
        self.records
            .lock()
            .expect("allocations poisoned")
            .insert(allocation.id, allocation);
    }

    pub(super) fn get(&self, id: AllocationId) -> Allocation {
        self.records
            .lock()
            .expect("allocations poisoned")
            .get(&id)
            .cloned()
            .expect("allocation seeded")
    }
}

impl AllocationRepository for MemoryAllocations {
    fn find(&self, id: AllocationId) -> Result<Option<Allocation>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("allocations poisoned")
            .get(&id)
            .cloned())
    }

    fn find_many(&self, ids: &[AllocationId]) -> Result<Vec<Allocation>, RepositoryError> {
        let records = self.records.lock().expect("allocations poisoned");
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    fn pending_starting_by(
        &self,
        tenant: &TenantCode,
        date: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let records = self.records.lock().expect("allocations poisoned");
        Ok(records
            .values()
            .filter(|a| {
                a.tenant == *tenant
                    && a.status == AllocationStatus::Pending
                    && a.start_date <= date
            })
            .cloned()
            .collect())
    }

    fn with_status(
        &self,
        tenant: &TenantCode,
        status: AllocationStatus,
    ) -> Result<Vec<Allocation>, RepositoryError> {
        let records = self.records.lock().expect("allocations poisoned");
        Ok(records
            .values()
            .filter(|a| a.tenant == *tenant && a.status == status)
            .cloned()
            .collect())
    }

    fn save(&self, allocation: Allocation) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("allocations poisoned")
            .insert(allocation.id, allocation);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemorySchedules {
    records: Mutex<BTreeMap<ScheduleId, ActivitySchedule>>,
}

impl MemorySchedules {
    pub(super) fn seed(&self, schedule: ActivitySchedule) {
        self.records
            .lock()
            .expect("schedules poisoned")
            .insert(schedule.id, schedule);
    }
}

impl ScheduleRepository for MemorySchedules {
    fn find(&self, id: ScheduleId) -> Result<Option<ActivitySchedule>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("schedules poisoned")
            .get(&id)
            .cloned())
    }

    fn active_for_tenant(
        &self,
        tenant: &TenantCode,
        date: NaiveDate,
    ) -> Result<Vec<ActivitySchedule>, RepositoryError> {
        let records = self.records.lock().expect("schedules poisoned");
        Ok(records
            .values()
            .filter(|s| {
                s.tenant == *tenant
                    && s.start_date <= date
                    && s.end_date.is_none_or(|end| end >= date)
            })
            .cloned()
            .collect())
    }

    fn save(&self, schedule: ActivitySchedule) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("schedules poisoned")
            .insert(schedule.id, schedule);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryCaseNotes {
    posted: Mutex<Vec<(PersonId, CaseNoteRequest)>>,
}

impl MemoryCaseNotes {
    pub(super) fn posted(&self) -> Vec<(PersonId, CaseNoteRequest)> {
        self.posted.lock().expect("case notes poisoned").clone()
    }
}

impl CaseNoteClient for MemoryCaseNotes {
    fn post_case_note(
        &self,
        _tenant: &TenantCode,
        person: &PersonId,
        request: &CaseNoteRequest,
    ) -> Result<String, CaseNoteError> {
        let mut posted = self.posted.lock().expect("case notes poisoned");
        posted.push((person.clone(), request.clone()));
        Ok(format!("case-note-{}", posted.len()))
    }
}

/// Records attendance side effects so tests can assert them.
#[derive(Default)]
pub(super) struct MemoryAttendance {
    pub(super) suspended: Mutex<Vec<(AllocationId, NaiveDate, bool)>>,
    pub(super) reinstated: Mutex<Vec<(AllocationId, NaiveDate)>>,
}

impl AttendanceUpdates for MemoryAttendance {
    fn suspend_future_attendance(&self, allocation: &Allocation, from: NaiveDate, paid: bool) {
        self.suspended
            .lock()
            .expect("attendance poisoned")
            .push((allocation.id, from, paid));
    }

    fn reinstate_future_attendance(&self, allocation: &Allocation, from: NaiveDate) {
        self.reinstated
            .lock()
            .expect("attendance poisoned")
            .push((allocation.id, from));
    }
}

pub(super) struct Fixture {
    pub(super) allocations: Arc<MemoryAllocations>,
    pub(super) schedules: Arc<MemorySchedules>,
    pub(super) case_notes: Arc<MemoryCaseNotes>,
    pub(super) attendance: Arc<MemoryAttendance>,
    pub(super) service:
        AllocationService<MemoryAllocations, MemorySchedules, MemoryCaseNotes, MemoryAttendance>,
}

pub(super) fn fixture() -> Fixture {
    let allocations = Arc::new(MemoryAllocations::default());
    let schedules = Arc::new(MemorySchedules::default());
    let case_notes = Arc::new(MemoryCaseNotes::default());
    let attendance = Arc::new(MemoryAttendance::default());
    let service = AllocationService::new(
        allocations.clone(),
        schedules.clone(),
        case_notes.clone(),
        attendance.clone(),
        Arc::new(FixedClock(today())),
    );
    Fixture {
        allocations,
        schedules,
        case_notes,
        attendance,
        service,
    }
}

pub(super) fn weekday_schedule() -> ActivitySchedule {
    ActivitySchedule {
        id: ScheduleId(10),
        tenant: tenant(),
        activity_summary: "Education".to_string(),
        start_date: today() - chrono::Duration::days(28),
        end_date: None,
        schedule_weeks: 1,
        runs_on_holidays: false,
        slots: vec![ScheduleSlot {
            week_number: 1,
            time_slot: TimeSlot::Am,
            days: DayOfWeekSet::from_days(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]),
            starts_at: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            ends_at: NaiveTime::from_hms_opt(11, 30, 0).expect("valid time"),
        }],
        instances: Vec::new(),
        suspensions: Vec::new(),
    }
}

pub(super) fn active_allocation(id: u64) -> Allocation {
    let mut allocation = Allocation::new(
        AllocationId(id),
        tenant(),
        PersonId(format!("A{id:04}AA")),
        ScheduleId(10),
        today() - chrono::Duration::days(14),
        None,
    )
    .expect("valid dates");
    allocation.activate(today()).expect("pending activates");
    allocation
}

pub(super) fn pending_allocation(id: u64, starts_in_days: i64) -> Allocation {
    Allocation::new(
        AllocationId(id),
        tenant(),
        PersonId(format!("A{id:04}AA")),
        ScheduleId(10),
        today() + chrono::Duration::days(starts_in_days),
        None,
    )
    .expect("valid dates")
}

pub(super) fn case_note_request() -> CaseNoteRequest {
    CaseNoteRequest {
        text: "Suspended from activity".to_string(),
        category: "NEG".to_string(),
        subcategory: "NEG_GEN".to_string(),
        context_line: "Education AM".to_string(),
    }
}
