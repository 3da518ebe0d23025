use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::HolidayCalendar;
use crate::domain::ScheduleId;
use crate::repository::{RepositoryError, Tenant};

use super::domain::{ActivitySchedule, SessionInstance};
use super::repository::ScheduleRepository;

/// Expands each active schedule's slot pattern into dated session instances
/// across a fixed look-ahead window.
pub struct InstanceMaterializer<R, H> {
    schedules: Arc<R>,
    calendar: Arc<H>,
    horizon_days: u16,
}

/// Outcome of one tenant's materialization run.
#[derive(Debug, Default, Serialize)]
pub struct MaterializeReport {
    pub schedules_seen: usize,
    pub instances_created: usize,
    pub failures: Vec<ScheduleFailure>,
}

/// One schedule whose materialization or save failed; siblings carry on.
#[derive(Debug, Serialize)]
pub struct ScheduleFailure {
    pub schedule_id: ScheduleId,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl<R, H> InstanceMaterializer<R, H>
where
    R: ScheduleRepository + 'static,
    H: HolidayCalendar + 'static,
{
    pub fn new(schedules: Arc<R>, calendar: Arc<H>, horizon_days: u16) -> Self {
        Self {
            schedules,
            calendar,
            horizon_days,
        }
    }

    /// Materialize every active schedule for `tenant`. A failure on one
    /// schedule is captured in the report and never aborts its siblings;
    /// re-running the same window is a no-op.
    pub fn run_for_tenant(
        &self,
        tenant: &Tenant,
        today: NaiveDate,
    ) -> Result<MaterializeReport, MaterializeError> {
        let schedules = self.schedules.active_for_tenant(&tenant.code, today)?;
        let mut report = MaterializeReport {
            schedules_seen: schedules.len(),
            ..MaterializeReport::default()
        };

        for mut schedule in schedules {
            let schedule_id = schedule.id;

            if let Err(err) = schedule.validate() {
                warn!(
                    tenant = %tenant.code,
                    schedule = schedule_id.0,
                    error = %err,
                    "schedule failed validation"
                );
                report.failures.push(ScheduleFailure {
                    schedule_id,
                    reason: err.to_string(),
                });
                continue;
            }

            let created =
                materialize(&mut schedule, today, self.horizon_days, |date| {
                    self.calendar.is_holiday(date, &tenant.jurisdiction)
                });

            if created.is_empty() {
                continue;
            }

            match self.schedules.save(schedule) {
                Ok(()) => {
                    info!(
                        tenant = %tenant.code,
                        schedule = schedule_id.0,
                        created = created.len(),
                        "materialized session instances"
                    );
                    report.instances_created += created.len();
                }
                Err(err) => {
                    warn!(
                        tenant = %tenant.code,
                        schedule = schedule_id.0,
                        error = %err,
                        "failed to save materialized schedule"
                    );
                    report.failures.push(ScheduleFailure {
                        schedule_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Expand `schedule` over `[today, today + horizon_days]`, appending the new
/// instances to the aggregate and returning copies of them.
///
/// Dates already holding an instance for a slot's time-of-day are skipped,
/// as are non-running holidays. A schedule-level suspension does not block
/// creation; the instance is stamped `suspended` instead.
pub fn materialize(
    schedule: &mut ActivitySchedule,
    today: NaiveDate,
    horizon_days: u16,
    is_holiday: impl Fn(NaiveDate) -> bool,
) -> Vec<SessionInstance> {
    let mut created = Vec::new();

    for offset in 0..=i64::from(horizon_days) {
        let date = today + Duration::days(offset);

        if !schedule.runs_on_holidays && is_holiday(date) {
            continue;
        }

        let suspended = schedule.suspended_on(date);
        let new_instances: Vec<SessionInstance> = schedule
            .slots_for(date)
            .into_iter()
            .filter(|slot| !schedule.has_instance(date, slot.time_slot))
            .map(|slot| SessionInstance {
                session_date: date,
                time_slot: slot.time_slot,
                starts_at: slot.starts_at,
                ends_at: slot.ends_at,
                suspended,
                cancelled: false,
            })
            .collect();

        for instance in new_instances {
            // Two slots in the same cycle week can share a time-of-day with
            // different day sets; only one instance may exist per pair.
            if !schedule.has_instance(instance.session_date, instance.time_slot) {
                schedule.instances.push(instance.clone());
                created.push(instance);
            }
        }
    }

    created
}
