use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::allocations::domain::{
    Allocation, AllocationStatus, DeallocationReason, AUTO_SUSPEND_MOVEMENT_REASON,
};
use crate::allocations::repository::{
    AllocationRepository, WaitingListRepository, WaitingListStatus,
};
use crate::domain::{AllocationId, PersonId, TenantCode};
use crate::repository::RepositoryError;

/// Where a person currently is, as reported by the prisoner-status system.
/// `tenant` is `None` when the person has no active booking anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrisonerLocation {
    pub person_id: PersonId,
    pub tenant: Option<TenantCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    In,
    Out,
}

/// Read-only external movement fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub person_id: PersonId,
    pub direction: MovementDirection,
    pub from_tenant: TenantCode,
    pub occurred_on: NaiveDate,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusClientError {
    #[error("prisoner status service unavailable: {0}")]
    Unavailable(String),
}

/// Outbound port to the prisoner-status system.
pub trait PrisonerStatusClient: Send + Sync {
    fn status_and_location(
        &self,
        person_ids: &[PersonId],
    ) -> Result<Vec<PrisonerLocation>, StatusClientError>;

    fn recent_movements(
        &self,
        tenant: &TenantCode,
        person_ids: &[PersonId],
    ) -> Result<Vec<Movement>, StatusClientError>;
}

/// Outcome of one tenant's evaluation pass.
#[derive(Debug, Default, Serialize)]
pub struct EvaluationReport {
    pub activated: Vec<AllocationId>,
    pub ended: Vec<AllocationId>,
    pub auto_suspended: Vec<AllocationId>,
    /// Allocations changed only by the date-boundary sweep (planned
    /// suspensions applied or lifted, planned deallocations applied,
    /// auto-suspensions reversed).
    pub swept: Vec<AllocationId>,
    pub failures: Vec<AllocationFailure>,
}

impl EvaluationReport {
    fn merge(mut self, other: EvaluationReport) -> Self {
        self.activated.extend(other.activated);
        self.ended.extend(other.ended);
        self.auto_suspended.extend(other.auto_suspended);
        self.swept.extend(other.swept);
        self.failures.extend(other.failures);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct AllocationFailure {
    pub allocation_id: AllocationId,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    StatusClient(#[from] StatusClientError),
}

/// Presence and movement evidence for one tenant, resolved once per pass.
struct TenantEvidence {
    present: BTreeSet<PersonId>,
    latest_departure: BTreeMap<PersonId, NaiveDate>,
}

impl TenantEvidence {
    fn present(&self, person: &PersonId) -> bool {
        self.present.contains(person)
    }

    /// Date of the most recent movement away from the tenant, when no later
    /// return exists.
    fn departed_on(&self, person: &PersonId) -> Option<NaiveDate> {
        if self.present(person) {
            return None;
        }
        self.latest_departure.get(person).copied()
    }
}

/// Decides, per tenant, which pending allocations come into force, which
/// have expired, and which in-force allocations must pause or resume on
/// movement evidence. Every decision is a re-derivation from stored facts,
/// so duplicate or replayed evaluation messages are safe.
pub struct AllocationEvaluator<R, W, P> {
    allocations: Arc<R>,
    waiting_lists: Arc<W>,
    prisoner_status: Arc<P>,
}

impl<R, W, P> AllocationEvaluator<R, W, P>
where
    R: AllocationRepository + 'static,
    W: WaitingListRepository + 'static,
    P: PrisonerStatusClient + 'static,
{
    pub fn new(allocations: Arc<R>, waiting_lists: Arc<W>, prisoner_status: Arc<P>) -> Self {
        Self {
            allocations,
            waiting_lists,
            prisoner_status,
        }
    }

    /// Full pass: new allocations first, then expiries and the date sweep.
    pub fn evaluate(
        &self,
        tenant: &TenantCode,
        today: NaiveDate,
    ) -> Result<EvaluationReport, EvaluationError> {
        let new_allocations = self.evaluate_new_allocations(tenant, today)?;
        let expiries = self.evaluate_expiries(tenant, today)?;
        Ok(new_allocations.merge(expiries))
    }

    /// Pending allocations whose start date has arrived: activate the ones
    /// whose person is confirmed present, expire the ones whose person left
    /// before today, and leave the rest untouched.
    pub fn evaluate_new_allocations(
        &self,
        tenant: &TenantCode,
        today: NaiveDate,
    ) -> Result<EvaluationReport, EvaluationError> {
        let pending = self.allocations.pending_starting_by(tenant, today)?;
        let evidence = self.gather_evidence(tenant, &pending)?;
        let mut report = EvaluationReport::default();

        for mut allocation in pending {
            let id = allocation.id;

            let result = if evidence.present(&allocation.person_id) {
                allocation.activate(today).map(|()| {
                    info!(allocation = id.0, tenant = %tenant, "allocation activated");
                    report.activated.push(id);
                })
            } else {
                match evidence.departed_on(&allocation.person_id) {
                    Some(departed_on) if departed_on < today => allocation
                        .deallocate(DeallocationReason::TemporarilyReleased, today)
                        .map(|()| {
                            info!(allocation = id.0, tenant = %tenant, "pending allocation expired");
                            report.ended.push(id);
                        }),
                    // Departed today or no movement on record: not yet due.
                    _ => continue,
                }
            };

            match result {
                Ok(()) => {
                    let ended_person = allocation.is_ended().then(|| allocation.person_id.clone());
                    if let Err(err) = self.allocations.save(allocation) {
                        capture_failure(&mut report, id, &err.to_string());
                        continue;
                    }
                    if let Some(person) = ended_person {
                        self.close_waiting_list(tenant, &person, &mut report, id);
                    }
                }
                Err(err) => capture_failure(&mut report, id, &err.to_string()),
            }
        }

        Ok(report)
    }

    /// Active and suspended allocations: auto-suspend on departure
    /// evidence, reinstate auto-suspensions once the person is back, and
    /// apply the date-boundary sweep everywhere else.
    pub fn evaluate_expiries(
        &self,
        tenant: &TenantCode,
        today: NaiveDate,
    ) -> Result<EvaluationReport, EvaluationError> {
        let mut in_force = Vec::new();
        for status in [
            AllocationStatus::Active,
            AllocationStatus::Suspended,
            AllocationStatus::SuspendedWithPay,
            AllocationStatus::AutoSuspended,
        ] {
            in_force.extend(self.allocations.with_status(tenant, status)?);
        }

        let evidence = self.gather_evidence(tenant, &in_force)?;
        let mut report = EvaluationReport::default();

        for mut allocation in in_force {
            let id = allocation.id;
            let departed = evidence.departed_on(&allocation.person_id);

            let outcome = match (allocation.status, departed) {
                (AllocationStatus::Active, Some(departed_on)) => allocation
                    .auto_suspend(departed_on, AUTO_SUSPEND_MOVEMENT_REASON)
                    .map(|()| {
                        info!(allocation = id.0, tenant = %tenant, on = %departed_on, "allocation auto-suspended");
                        report.auto_suspended.push(id);
                        true
                    }),
                (AllocationStatus::AutoSuspended, None)
                    if evidence.present(&allocation.person_id) =>
                {
                    allocation.reinstate().map(|()| {
                        info!(allocation = id.0, tenant = %tenant, "allocation reinstated");
                        report.swept.push(id);
                        true
                    })
                }
                (AllocationStatus::AutoSuspended, _) => Ok(false),
                _ => allocation.apply_due_changes(today).map(|changed| {
                    if changed {
                        report.swept.push(id);
                    }
                    changed
                }),
            };

            match outcome {
                Ok(true) => {
                    if let Err(err) = self.allocations.save(allocation) {
                        capture_failure(&mut report, id, &err.to_string());
                    }
                }
                Ok(false) => {}
                Err(err) => capture_failure(&mut report, id, &err.to_string()),
            }
        }

        Ok(report)
    }

    fn gather_evidence(
        &self,
        tenant: &TenantCode,
        allocations: &[Allocation],
    ) -> Result<TenantEvidence, EvaluationError> {
        let person_ids: Vec<PersonId> = allocations
            .iter()
            .map(|allocation| allocation.person_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let locations = self.prisoner_status.status_and_location(&person_ids)?;
        let present = locations
            .into_iter()
            .filter(|location| location.tenant.as_ref() == Some(tenant))
            .map(|location| location.person_id)
            .collect();

        let movements = self.prisoner_status.recent_movements(tenant, &person_ids)?;
        Ok(TenantEvidence {
            present,
            latest_departure: latest_departures(&movements, tenant),
        })
    }

    fn close_waiting_list(
        &self,
        tenant: &TenantCode,
        person: &PersonId,
        report: &mut EvaluationReport,
        allocation_id: AllocationId,
    ) {
        let applications = match self.waiting_lists.open_for_person(tenant, person) {
            Ok(applications) => applications,
            Err(err) => {
                capture_failure(report, allocation_id, &err.to_string());
                return;
            }
        };
        for mut application in applications {
            application.status = WaitingListStatus::Closed;
            if let Err(err) = self.waiting_lists.save(application) {
                capture_failure(report, allocation_id, &err.to_string());
            }
        }
    }
}

fn capture_failure(report: &mut EvaluationReport, id: AllocationId, reason: &str) {
    warn!(allocation = id.0, reason, "evaluation failed for allocation");
    report.failures.push(AllocationFailure {
        allocation_id: id,
        reason: reason.to_string(),
    });
}

/// Most recent movement per person, kept only when it points away from
/// `tenant` with no later return.
fn latest_departures(
    movements: &[Movement],
    tenant: &TenantCode,
) -> BTreeMap<PersonId, NaiveDate> {
    let mut latest: BTreeMap<PersonId, &Movement> = BTreeMap::new();
    for movement in movements {
        let entry = latest.entry(movement.person_id.clone()).or_insert(movement);
        if movement.occurred_on >= entry.occurred_on {
            *entry = movement;
        }
    }

    latest
        .into_iter()
        .filter(|(_, movement)| {
            movement.direction == MovementDirection::Out && movement.from_tenant == *tenant
        })
        .map(|(person, movement)| (person, movement.occurred_on))
        .collect()
}
