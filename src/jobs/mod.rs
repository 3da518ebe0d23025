//! Fleet-wide jobs split into one message per tenant with tracked
//! completion and statically wired follow-on jobs.

pub mod fanout;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{JobId, TenantCode};
use crate::repository::RepositoryError;

pub use fanout::{
    FailureMonitor, FanOut, FanOutError, FleetFailure, MessageTransport, TenantJobRouter,
    TenantWorker, TransportError, WorkerError,
};

/// The tenant-scoped units of work the scheduler can fan out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    MaterializeInstances,
    ActivateAllocations,
    ExpireAllocations,
}

impl JobType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MaterializeInstances => "materialize instances",
            Self::ActivateAllocations => "activate allocations",
            Self::ExpireAllocations => "expire allocations",
        }
    }

    /// The statically wired follow-on job started when this one completes.
    pub const fn next(self) -> Option<JobType> {
        match self {
            Self::MaterializeInstances => Some(Self::ActivateAllocations),
            Self::ActivateAllocations => Some(Self::ExpireAllocations),
            Self::ExpireAllocations => None,
        }
    }
}

/// One fleet-wide orchestration record: complete once every enumerated
/// tenant has reported in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub target: u32,
    pub completed: u32,
}

impl Job {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.target
    }
}

/// Parameters carried by every per-tenant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    pub today: NaiveDate,
}

/// Per-tenant unit of work published to the message transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: JobId,
    pub job_type: JobType,
    pub tenant: TenantCode,
    pub params: JobParameters,
}

/// Result of recording one tenant's completion against a job.
///
/// Implementations record completion per distinct tenant with an atomic
/// conditional update: a duplicate delivery comes back with
/// `newly_recorded = false` and an unchanged count, so only one caller ever
/// observes `completed` reaching `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobCompletion {
    pub newly_recorded: bool,
    pub completed: u32,
    pub target: u32,
}

impl JobCompletion {
    /// True only for the single call that moved the count to the target.
    pub fn finished_the_job(&self) -> bool {
        self.newly_recorded && self.completed == self.target
    }
}

/// Storage abstraction for job records and their completion counters.
pub trait JobRepository: Send + Sync {
    fn create(&self, job_type: JobType, target: u32) -> Result<Job, RepositoryError>;

    fn find(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    fn record_completion(
        &self,
        id: JobId,
        tenant: &TenantCode,
    ) -> Result<JobCompletion, RepositoryError>;
}
