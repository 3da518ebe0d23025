use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{AllocationId, PersonId, TenantCode};
use crate::repository::RepositoryError;

use super::domain::{Allocation, AllocationStatus};

/// Storage abstraction for allocation aggregates. Each aggregate is loaded
/// fresh, mutated in memory, and persisted in one `save`.
pub trait AllocationRepository: Send + Sync {
    fn find(&self, id: AllocationId) -> Result<Option<Allocation>, RepositoryError>;
    fn find_many(&self, ids: &[AllocationId]) -> Result<Vec<Allocation>, RepositoryError>;

    /// Pending allocations at `tenant` whose start date is on or before `date`.
    fn pending_starting_by(
        &self,
        tenant: &TenantCode,
        date: NaiveDate,
    ) -> Result<Vec<Allocation>, RepositoryError>;

    fn with_status(
        &self,
        tenant: &TenantCode,
        status: AllocationStatus,
    ) -> Result<Vec<Allocation>, RepositoryError>;

    fn save(&self, allocation: Allocation) -> Result<(), RepositoryError>;
}

/// Open application on an activity waiting list; closed as a side effect
/// when the person's pending allocation expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingListApplication {
    pub id: u64,
    pub tenant: TenantCode,
    pub person_id: PersonId,
    pub status: WaitingListStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingListStatus {
    Open,
    Closed,
}

pub trait WaitingListRepository: Send + Sync {
    fn open_for_person(
        &self,
        tenant: &TenantCode,
        person: &PersonId,
    ) -> Result<Vec<WaitingListApplication>, RepositoryError>;

    fn save(&self, application: WaitingListApplication) -> Result<(), RepositoryError>;
}

/// Request body for a case note posted alongside a suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseNoteRequest {
    pub text: String,
    pub category: String,
    pub subcategory: String,
    pub context_line: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CaseNoteError {
    #[error("case note service unavailable: {0}")]
    Unavailable(String),
}

/// Outbound port to the external case-note system.
pub trait CaseNoteClient: Send + Sync {
    fn post_case_note(
        &self,
        tenant: &TenantCode,
        person: &PersonId,
        request: &CaseNoteRequest,
    ) -> Result<String, CaseNoteError>;
}

/// Side-effect port marking an allocation's not-yet-attended future session
/// instances suspended or putting them back.
pub trait AttendanceUpdates: Send + Sync {
    fn suspend_future_attendance(&self, allocation: &Allocation, from: NaiveDate, paid: bool);
    fn reinstate_future_attendance(&self, allocation: &Allocation, from: NaiveDate);
}
