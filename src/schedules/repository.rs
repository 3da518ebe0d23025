use chrono::NaiveDate;

use crate::domain::{ScheduleId, TenantCode};
use crate::repository::RepositoryError;

use super::domain::ActivitySchedule;

/// Storage abstraction for schedule aggregates (slots and instances load and
/// save with the schedule in one write).
pub trait ScheduleRepository: Send + Sync {
    fn find(&self, id: ScheduleId) -> Result<Option<ActivitySchedule>, RepositoryError>;

    /// Schedules at `tenant` whose date range includes `date`.
    fn active_for_tenant(
        &self,
        tenant: &TenantCode,
        date: NaiveDate,
    ) -> Result<Vec<ActivitySchedule>, RepositoryError>;

    fn save(&self, schedule: ActivitySchedule) -> Result<(), RepositoryError>;
}
