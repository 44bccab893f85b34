use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use batchop_core::{
    ActionError, ExecutionStrategy, Failure, OperationError, OperationKind, OperationReport,
    OperationResult, OperationStatus,
};
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::executor::context::ExecutionContext;
use crate::executor::events::Event;
use crate::executor::operation::Operation;

/// Ordered batch of child operations, run sequentially or in parallel.
///
/// Lock order is `state` then `children`; nothing takes them the other way.
pub struct CompositeOperation {
    id: Uuid,
    name: String,
    strategy: ExecutionStrategy,
    children: RwLock<Vec<Arc<dyn Operation>>>,
    state: Mutex<OperationResult>,
    cancelled: Arc<AtomicBool>,
}

/// Outcome of running every child, before it is folded into the node state.
struct Aggregate {
    all_success: bool,
    failures: Vec<Failure>,
}

impl Aggregate {
    fn new() -> Self {
        Self {
            all_success: true,
            failures: Vec::new(),
        }
    }

    fn absorb(&mut self, child: OperationResult) {
        if !child.is_success() {
            self.all_success = false;
            self.failures.extend(child.errors);
        }
    }
}

impl CompositeOperation {
    pub fn new(name: impl Into<String>, strategy: ExecutionStrategy) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            strategy,
            children: RwLock::new(Vec::new()),
            state: Mutex::new(OperationResult::pending()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sequential(name: impl Into<String>) -> Self {
        Self::new(name, ExecutionStrategy::Sequential)
    }

    pub fn parallel(name: impl Into<String>) -> Self {
        Self::new(name, ExecutionStrategy::Parallel)
    }

    pub fn with_children(self, children: impl IntoIterator<Item = Arc<dyn Operation>>) -> Self {
        self.children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(children);
        self
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Appends a child. Rejected once this composite has started executing
    /// or has been cancelled.
    pub fn add_operation(&self, op: Arc<dyn Operation>) -> Result<(), OperationError> {
        let state = self.state();
        if !state.is_pending() {
            return Err(OperationError::AlreadyStarted {
                name: self.name.clone(),
            });
        }
        self.children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
        Ok(())
    }

    pub fn children(&self) -> Vec<Arc<dyn Operation>> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.children.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Percentage of direct children whose own result is terminal.
    /// An empty composite is trivially complete.
    pub fn get_progress(&self) -> f64 {
        let children = self.children();
        if children.is_empty() {
            return 100.0;
        }
        let completed = children.iter().filter(|c| c.is_complete()).count();
        100.0 * completed as f64 / children.len() as f64
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, OperationResult> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_sequential(
        &self,
        children: &[Arc<dyn Operation>],
        ctx: &ExecutionContext,
    ) -> Aggregate {
        let mut agg = Aggregate::new();
        for (idx, child) in children.iter().enumerate() {
            if ctx.is_cancelled() {
                debug!(
                    operation = %self.name,
                    skipped = children.len() - idx,
                    "composite cancelled, not starting remaining children"
                );
                agg.all_success = false;
                break;
            }
            agg.absorb(child.execute(ctx).await);
        }
        agg
    }

    async fn run_parallel(
        &self,
        children: &[Arc<dyn Operation>],
        ctx: &ExecutionContext,
    ) -> Aggregate {
        let mut set = JoinSet::new();
        for child in children {
            let child = Arc::clone(child);
            let ctx = ctx.clone();
            set.spawn(async move {
                // Cancelled before this task was first polled: leave the child untouched.
                if ctx.is_cancelled() {
                    return child.result();
                }
                child.execute(&ctx).await
            });
        }

        let mut agg = Aggregate::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => agg.absorb(result),
                Err(e) => {
                    warn!(operation = %self.name, error = %e, "child task did not complete");
                    agg.all_success = false;
                    agg.failures.push(Failure::action(
                        &self.name,
                        &ActionError::new(format!("child task failed: {e}")),
                    ));
                }
            }
        }
        agg
    }

    fn live_status(&self, children: &[Arc<dyn Operation>]) -> OperationStatus {
        let statuses: Vec<OperationStatus> = children.iter().map(|c| c.get_status()).collect();
        if statuses.contains(&OperationStatus::Failure) {
            OperationStatus::Failure
        } else if statuses.contains(&OperationStatus::InProgress) {
            OperationStatus::InProgress
        } else if statuses.iter().all(|s| *s == OperationStatus::Success) {
            OperationStatus::Success
        } else {
            OperationStatus::Pending
        }
    }
}

#[async_trait]
impl Operation for CompositeOperation {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ExecutionContext) -> OperationResult {
        let children = {
            let mut state = self.state();
            if !state.begin() {
                warn!(
                    operation = %self.name,
                    status = %state.status,
                    "composite already started, not executing again"
                );
                return state.clone();
            }
            self.children()
        };

        debug!(
            operation = %self.name,
            strategy = self.strategy.as_str(),
            children = children.len(),
            "composite started"
        );
        ctx.emit(Event::OperationStarted {
            id: self.id,
            name: self.name.clone(),
        })
        .await;

        let started = Instant::now();
        let scoped = ctx.scoped(&self.cancelled);
        let agg = match self.strategy {
            ExecutionStrategy::Sequential => self.run_sequential(&children, &scoped).await,
            ExecutionStrategy::Parallel => self.run_parallel(&children, &scoped).await,
        };

        let result = {
            let mut state = self.state();
            state.finish_aggregate(agg.all_success, agg.failures);
            if self.is_cancelled() && !state.errors.iter().any(Failure::is_cancellation) {
                state.append_failure(Failure::cancelled(&self.name));
            }
            state.clone()
        };
        debug!(
            operation = %self.name,
            status = %result.status,
            errors = result.errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "composite finished"
        );

        let event = if self.is_cancelled() {
            Event::OperationCancelled {
                id: self.id,
                name: self.name.clone(),
            }
        } else if result.is_success() {
            Event::OperationSucceeded {
                id: self.id,
                name: self.name.clone(),
            }
        } else {
            Event::OperationFailed {
                id: self.id,
                name: self.name.clone(),
                errors: result.errors.len(),
            }
        };
        ctx.emit(event).await;
        result
    }

    fn cancel(&self) {
        {
            let mut state = self.state();
            if state.is_complete() {
                return;
            }
            // Raised before the cascade so a child starting concurrently still sees it.
            self.cancelled.store(true, Ordering::SeqCst);
            let never_started = state.is_pending();
            state.force_failure();
            if never_started {
                state.append_failure(Failure::cancelled(&self.name));
            }
        }
        warn!(operation = %self.name, "composite cancelled");
        for child in self.children() {
            child.cancel();
        }
    }

    fn get_status(&self) -> OperationStatus {
        if self.is_cancelled() {
            return OperationStatus::Failure;
        }
        self.live_status(&self.children())
    }

    fn result(&self) -> OperationResult {
        self.state().clone()
    }

    fn report(&self) -> OperationReport {
        let children = self.children();
        OperationReport {
            id: self.id,
            name: self.name.clone(),
            kind: OperationKind::Composite,
            strategy: Some(self.strategy),
            status: self.get_status(),
            progress: self.get_progress(),
            errors: self.result().errors,
            children: children.iter().map(|c| c.report()).collect(),
        }
    }
}

impl std::fmt::Debug for CompositeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeOperation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("children", &self.len())
            .field("status", &self.get_status())
            .finish()
    }
}
