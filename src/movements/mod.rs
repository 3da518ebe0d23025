//! External movement facts and the evaluator that turns them into
//! allocation transitions at each tenant.

pub mod evaluator;

pub use evaluator::{
    AllocationEvaluator, AllocationFailure, EvaluationError, EvaluationReport, Movement,
    MovementDirection, PrisonerLocation, PrisonerStatusClient, StatusClientError,
};
