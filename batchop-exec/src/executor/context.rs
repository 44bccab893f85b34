use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::executor::events::{Event, EventSink, NoOpEventSink};
use crate::executor::pool::WorkerPool;

/// Everything a node needs from its engine while executing.
///
/// Passed explicitly down the tree; cloning is cheap and shares the pool.
/// Each composite hands its children a context that also carries its own
/// cancellation flag, so a node can see that an ancestor was cancelled
/// before it started.
#[derive(Clone)]
pub struct ExecutionContext {
    pool: WorkerPool,
    events: Arc<dyn EventSink>,
    cancel_scopes: Vec<Arc<AtomicBool>>,
}

impl ExecutionContext {
    pub fn new(pool: WorkerPool, events: Arc<dyn EventSink>) -> Self {
        Self {
            pool,
            events,
            cancel_scopes: Vec::new(),
        }
    }

    /// Context with its own pool and no event output, handy for tests.
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self::new(WorkerPool::new(pool_size), Arc::new(NoOpEventSink))
    }

    pub(crate) fn scoped(&self, cancelled: &Arc<AtomicBool>) -> Self {
        let mut ctx = self.clone();
        ctx.cancel_scopes.push(Arc::clone(cancelled));
        ctx
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// True once any enclosing composite has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_scopes.iter().any(|c| c.load(Ordering::SeqCst))
    }

    pub async fn emit(&self, event: Event) {
        self.events.emit(event).await;
    }
}
