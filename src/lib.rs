//! Core engine for recurring activity schedules and allocation lifecycles.
//!
//! Each prison tenant owns its activity schedules, the materialized session
//! instances for a rolling look-ahead window, and the allocations enrolling
//! people into those schedules. Fleet-wide work (materialization, allocation
//! activation, expiry) fans out as one message per tenant; every tenant-scoped
//! unit of work is an idempotent re-derivation from stored facts so that
//! at-least-once delivery is safe.

pub mod allocations;
pub mod calendar;
pub mod config;
pub mod domain;
pub mod jobs;
pub mod movements;
pub mod repository;
pub mod schedules;
pub mod telemetry;
