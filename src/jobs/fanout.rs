use std::sync::Arc;

use tracing::{info, warn};

use crate::allocations::repository::{AllocationRepository, WaitingListRepository};
use crate::calendar::HolidayCalendar;
use crate::domain::TenantCode;
use crate::movements::evaluator::{AllocationEvaluator, PrisonerStatusClient};
use crate::repository::{RepositoryError, Tenant, TenantRegistry};
use crate::schedules::materializer::InstanceMaterializer;
use crate::schedules::repository::ScheduleRepository;

use super::{Job, JobMessage, JobParameters, JobRepository, JobType};

/// Message transport error; delivery is at-least-once and unordered, so the
/// transport owns retries and timeouts.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("message transport unavailable: {0}")]
    Unavailable(String),
}

/// Outbound port publishing one message per tenant.
pub trait MessageTransport: Send + Sync {
    fn publish(&self, message: &JobMessage) -> Result<(), TransportError>;
}

/// Captured per-tenant failure forwarded to the monitoring collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetFailure {
    pub job_type: JobType,
    pub tenant: TenantCode,
    pub reason: String,
}

/// Outbound port for partial fleet failures.
pub trait FailureMonitor: Send + Sync {
    fn record(&self, failure: FleetFailure);
}

/// Error raised by the tenant-scoped unit of work.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("unknown tenant {0}")]
    UnknownTenant(TenantCode),
    #[error("{0}")]
    Failed(String),
}

/// The tenant-scoped unit of work behind a fan-out message. Implementations
/// must be idempotent: duplicate deliveries re-run the same derivation.
pub trait TenantWorker: Send + Sync {
    fn run(
        &self,
        job_type: JobType,
        tenant: &TenantCode,
        params: &JobParameters,
    ) -> Result<(), WorkerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Splits a fleet-wide job into one message per live tenant, counts the
/// completions coming back, and chains the configured follow-on job when
/// the count reaches the tenant total.
pub struct FanOut<J, T, G, M> {
    jobs: Arc<J>,
    transport: Arc<T>,
    tenants: Arc<G>,
    monitor: Arc<M>,
}

impl<J, T, G, M> FanOut<J, T, G, M>
where
    J: JobRepository + 'static,
    T: MessageTransport + 'static,
    G: TenantRegistry + 'static,
    M: FailureMonitor + 'static,
{
    pub fn new(jobs: Arc<J>, transport: Arc<T>, tenants: Arc<G>, monitor: Arc<M>) -> Self {
        Self {
            jobs,
            transport,
            tenants,
            monitor,
        }
    }

    /// Create the job record sized to the live tenant count and publish one
    /// message per tenant. With no live tenants the job is trivially
    /// complete and the follow-on starts straight away.
    pub fn start_job(&self, job_type: JobType, params: JobParameters) -> Result<Job, FanOutError> {
        let tenants = self.tenants.live_tenants()?;
        let job = self.jobs.create(job_type, tenants.len() as u32)?;
        info!(job = %job.id, kind = job_type.label(), tenants = tenants.len(), "fan-out started");

        if tenants.is_empty() {
            self.start_next(job_type, params)?;
            return Ok(job);
        }

        for tenant in &tenants {
            self.transport.publish(&JobMessage {
                job_id: job.id,
                job_type,
                tenant: tenant.code.clone(),
                params,
            })?;
        }

        Ok(job)
    }

    /// Handle one per-tenant message: run the unit of work, capture any
    /// failure without blocking completion counting, and chain the next job
    /// exactly once when this completion is the one that fills the target.
    pub fn on_message(
        &self,
        message: &JobMessage,
        worker: &dyn TenantWorker,
    ) -> Result<(), FanOutError> {
        if let Err(err) = worker.run(message.job_type, &message.tenant, &message.params) {
            warn!(
                job = %message.job_id,
                tenant = %message.tenant,
                error = %err,
                "tenant unit of work failed"
            );
            self.monitor.record(FleetFailure {
                job_type: message.job_type,
                tenant: message.tenant.clone(),
                reason: err.to_string(),
            });
        }

        let completion = self
            .jobs
            .record_completion(message.job_id, &message.tenant)?;

        if completion.finished_the_job() {
            info!(job = %message.job_id, kind = message.job_type.label(), "fan-out complete");
            self.start_next(message.job_type, message.params)?;
        }

        Ok(())
    }

    fn start_next(&self, finished: JobType, params: JobParameters) -> Result<(), FanOutError> {
        if let Some(next) = finished.next() {
            self.start_job(next, params)?;
        }
        Ok(())
    }
}

/// Dispatches each fan-out message into the materializer or the evaluator
/// for the named tenant.
pub struct TenantJobRouter<SR, H, AR, WR, P, G> {
    materializer: InstanceMaterializer<SR, H>,
    evaluator: AllocationEvaluator<AR, WR, P>,
    tenants: Arc<G>,
}

impl<SR, H, AR, WR, P, G> TenantJobRouter<SR, H, AR, WR, P, G>
where
    SR: ScheduleRepository + 'static,
    H: HolidayCalendar + 'static,
    AR: AllocationRepository + 'static,
    WR: WaitingListRepository + 'static,
    P: PrisonerStatusClient + 'static,
    G: TenantRegistry + 'static,
{
    pub fn new(
        materializer: InstanceMaterializer<SR, H>,
        evaluator: AllocationEvaluator<AR, WR, P>,
        tenants: Arc<G>,
    ) -> Self {
        Self {
            materializer,
            evaluator,
            tenants,
        }
    }

    fn resolve(&self, code: &TenantCode) -> Result<Tenant, WorkerError> {
        self.tenants
            .live_tenants()
            .map_err(|err| WorkerError::Failed(err.to_string()))?
            .into_iter()
            .find(|tenant| tenant.code == *code)
            .ok_or_else(|| WorkerError::UnknownTenant(code.clone()))
    }
}

impl<SR, H, AR, WR, P, G> TenantWorker for TenantJobRouter<SR, H, AR, WR, P, G>
where
    SR: ScheduleRepository + 'static,
    H: HolidayCalendar + 'static,
    AR: AllocationRepository + 'static,
    WR: WaitingListRepository + 'static,
    P: PrisonerStatusClient + 'static,
    G: TenantRegistry + 'static,
{
    fn run(
        &self,
        job_type: JobType,
        tenant: &TenantCode,
        params: &JobParameters,
    ) -> Result<(), WorkerError> {
        match job_type {
            JobType::MaterializeInstances => {
                let tenant = self.resolve(tenant)?;
                self.materializer
                    .run_for_tenant(&tenant, params.today)
                    .map_err(|err| WorkerError::Failed(err.to_string()))?;
            }
            JobType::ActivateAllocations => {
                self.evaluator
                    .evaluate_new_allocations(tenant, params.today)
                    .map_err(|err| WorkerError::Failed(err.to_string()))?;
            }
            JobType::ExpireAllocations => {
                self.evaluator
                    .evaluate_expiries(tenant, params.today)
                    .map_err(|err| WorkerError::Failed(err.to_string()))?;
            }
        }
        Ok(())
    }
}
