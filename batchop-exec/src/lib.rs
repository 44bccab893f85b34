#![forbid(unsafe_code)]

//! Runtime engine for composite batch operations.
//!
//! The data model lives in `batchop-core`; this crate executes trees of
//! [`LeafOperation`]s and [`CompositeOperation`]s on a bounded worker pool.

pub mod executor;

pub use batchop_core::{
    ActionError, EngineError, ExecutionStrategy, Failure, FailureKind, OperationError,
    OperationReport, OperationResult, OperationStatus,
};
pub use crate::executor::{
    action_fn, Action, CompositeOperation, Engine, EngineConfig, ExecutionContext, FnAction,
    LeafOperation, Operation, WorkerPool,
};
