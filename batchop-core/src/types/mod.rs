mod report;
mod result;
mod status;

pub use report::{OperationKind, OperationReport, StatusCounts};
pub use result::{Failure, FailureKind, OperationResult};
pub use status::{ExecutionStrategy, OperationStatus};
