use async_trait::async_trait;
use batchop_core::{OperationReport, OperationResult, OperationStatus};
use uuid::Uuid;

use crate::executor::context::ExecutionContext;

mod sealed {
    pub trait Sealed {}

    impl Sealed for crate::executor::leaf::LeafOperation {}
    impl Sealed for crate::executor::composite::CompositeOperation {}
}

/// Capability shared by leaves and composites, so a whole subtree can be
/// driven as a single operation.
///
/// Sealed: composite aggregation only understands these two variants.
#[async_trait]
pub trait Operation: Send + Sync + sealed::Sealed {
    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    /// Runs the node to a terminal state and returns its own result.
    ///
    /// Failures are captured in the returned result, never propagated as
    /// errors. A node executes at most once; calling this again returns the
    /// current result without re-running anything.
    async fn execute(&self, ctx: &ExecutionContext) -> OperationResult;

    /// Best-effort, non-blocking cancellation.
    fn cancel(&self);

    /// Current status. Never waits on execution.
    fn get_status(&self) -> OperationStatus;

    /// Snapshot of the node's own stored result.
    fn result(&self) -> OperationResult;

    fn is_complete(&self) -> bool {
        self.result().is_complete()
    }

    fn report(&self) -> OperationReport;
}
