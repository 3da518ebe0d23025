//! Activity schedules, their recurring slots, and the materialized session
//! instances kept in sync over a rolling look-ahead window.

pub mod domain;
pub mod materializer;
pub mod repository;

pub use domain::{
    ActivitySchedule, ScheduleError, ScheduleSlot, ScheduleSuspension, SessionInstance,
};
pub use materializer::{
    InstanceMaterializer, MaterializeError, MaterializeReport, ScheduleFailure,
};
pub use repository::ScheduleRepository;
