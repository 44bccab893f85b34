use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use batchop_core::{
    ActionError, Failure, OperationKind, OperationReport, OperationResult, OperationStatus,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::executor::action::{catch_panic, Action};
use crate::executor::context::ExecutionContext;
use crate::executor::events::Event;
use crate::executor::operation::Operation;

/// Executes one unit of external work.
pub struct LeafOperation {
    id: Uuid,
    name: String,
    payload: serde_json::Value,
    action: Arc<dyn Action>,
    state: Mutex<OperationResult>,
}

/// How the action's outcome met the node state once it returned.
enum Settled {
    Succeeded,
    Failed(usize),
    CancelledAfterSuccess,
    CancelledAfterFailure(ActionError),
}

impl LeafOperation {
    pub fn new(
        name: impl Into<String>,
        payload: serde_json::Value,
        action: impl Action + 'static,
    ) -> Self {
        Self::with_action(name, payload, Arc::new(action))
    }

    pub fn with_action(
        name: impl Into<String>,
        payload: serde_json::Value,
        action: Arc<dyn Action>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            payload,
            action,
            state: Mutex::new(OperationResult::pending()),
        }
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    fn state(&self) -> MutexGuard<'_, OperationResult> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn finish_cancelled(&self, ctx: &ExecutionContext) -> OperationResult {
        ctx.emit(Event::OperationCancelled {
            id: self.id,
            name: self.name.clone(),
        })
        .await;
        self.result()
    }

    async fn compensate(&self) {
        debug!(operation = %self.name, "action completed after cancellation, compensating");
        if let Err(e) = catch_panic(self.action.compensate(&self.payload)).await {
            warn!(operation = %self.name, error = %e, "compensation failed");
            self.state().append_failure(Failure::compensation(&self.name, &e));
        }
    }
}

#[async_trait]
impl Operation for LeafOperation {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ExecutionContext) -> OperationResult {
        {
            let mut state = self.state();
            if !state.begin() {
                warn!(
                    operation = %self.name,
                    status = %state.status,
                    "leaf already started, not executing again"
                );
                return state.clone();
            }
        }

        let permit = ctx.pool().acquire().await;
        if ctx.is_cancelled() {
            self.cancel();
        }
        if self.is_complete() {
            // Cancelled while queued for a slot; the action never runs.
            drop(permit);
            return self.finish_cancelled(ctx).await;
        }
        debug!(operation = %self.name, "leaf started");
        ctx.emit(Event::OperationStarted {
            id: self.id,
            name: self.name.clone(),
        })
        .await;
        let outcome = catch_panic(self.action.run(&self.payload)).await;
        drop(permit);

        let settled = {
            let mut state = self.state();
            match outcome {
                Ok(()) if state.succeed() => Settled::Succeeded,
                Ok(()) => Settled::CancelledAfterSuccess,
                Err(e) => {
                    if state.fail(Failure::action(&self.name, &e)) {
                        Settled::Failed(state.errors.len())
                    } else {
                        Settled::CancelledAfterFailure(e)
                    }
                }
            }
        };

        match settled {
            Settled::Succeeded => {
                debug!(operation = %self.name, "leaf succeeded");
                ctx.emit(Event::OperationSucceeded {
                    id: self.id,
                    name: self.name.clone(),
                })
                .await;
                self.result()
            }
            Settled::Failed(errors) => {
                debug!(operation = %self.name, "leaf failed");
                ctx.emit(Event::OperationFailed {
                    id: self.id,
                    name: self.name.clone(),
                    errors,
                })
                .await;
                self.result()
            }
            Settled::CancelledAfterSuccess => {
                self.compensate().await;
                self.finish_cancelled(ctx).await
            }
            Settled::CancelledAfterFailure(e) => {
                debug!(
                    operation = %self.name,
                    error = %e,
                    "action failed after cancellation, outcome discarded"
                );
                self.finish_cancelled(ctx).await
            }
        }
    }

    fn cancel(&self) {
        let mut state = self.state();
        if state.status != OperationStatus::InProgress {
            return;
        }
        state.fail(Failure::cancelled(&self.name));
        warn!(operation = %self.name, "leaf cancelled");
    }

    fn get_status(&self) -> OperationStatus {
        self.state().status
    }

    fn result(&self) -> OperationResult {
        self.state().clone()
    }

    fn report(&self) -> OperationReport {
        let result = self.result();
        OperationReport {
            id: self.id,
            name: self.name.clone(),
            kind: OperationKind::Leaf,
            strategy: None,
            status: result.status,
            progress: if result.is_complete() { 100.0 } else { 0.0 },
            errors: result.errors,
            children: Vec::new(),
        }
    }
}

impl std::fmt::Debug for LeafOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafOperation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.get_status())
            .finish()
    }
}
