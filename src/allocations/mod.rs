//! Allocation lifecycle: the status state machine, planned suspensions,
//! recurring slot exclusions, and the operator-facing suspension engine.

pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Allocation, AllocationError, AllocationEvent, AllocationStatus, DeallocationReason,
    PlannedDeallocation, PlannedSuspension, SlotExclusion,
};
pub use repository::{
    AllocationRepository, AttendanceUpdates, CaseNoteClient, CaseNoteError, CaseNoteRequest,
    WaitingListApplication, WaitingListRepository, WaitingListStatus,
};
pub use service::{AllocationService, AllocationServiceError};
