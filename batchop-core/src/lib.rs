#![forbid(unsafe_code)]

//! Data model for composite batch operations.
//!
//! Execution lives in `batchop-exec`; this crate only knows about statuses,
//! results, failure records and report snapshots.

pub mod error;
pub mod types;

pub use crate::error::{ActionError, EngineError, OperationError};
pub use crate::types::{
    ExecutionStrategy, Failure, FailureKind, OperationKind, OperationReport, OperationResult,
    OperationStatus, StatusCounts,
};
