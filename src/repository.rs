//! Shared persistence contracts.

use serde::{Deserialize, Serialize};

use crate::domain::TenantCode;

/// Error enumeration shared by every repository trait.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// One live tenant as known to the fleet registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub code: TenantCode,
    /// Jurisdiction feeding the holiday calendar (e.g. "england-and-wales").
    pub jurisdiction: String,
}

/// Enumerates the tenants a fleet-wide job must cover.
pub trait TenantRegistry: Send + Sync {
    fn live_tenants(&self) -> Result<Vec<Tenant>, RepositoryError>;
}
