use std::sync::Arc;
use std::time::{Duration, Instant};

use batchop_core::{EngineError, OperationResult};
use tracing::{info, warn};

use crate::executor::context::ExecutionContext;
use crate::executor::events::{Event, EventSink, NoOpEventSink};
use crate::executor::operation::Operation;
use crate::executor::pool::WorkerPool;
use crate::executor::types::EngineConfig;

/// Owns the worker pool and event sink that every tree it runs shares.
pub struct Engine {
    config: EngineConfig,
    pool: WorkerPool,
    event_sink: Arc<dyn EventSink>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let pool = WorkerPool::new(config.pool_size);
        Ok(Self {
            config,
            pool,
            event_sink: Arc::new(NoOpEventSink),
        })
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.pool.clone(), self.event_sink.clone())
    }

    pub async fn execute(&self, root: &dyn Operation) -> OperationResult {
        self.run(root, None).await
    }

    /// Like [`execute`](Self::execute), but cancels `root` once `deadline`
    /// elapses. The returned result is still the root's final result; in-flight
    /// actions are not interrupted.
    pub async fn execute_with_deadline(
        &self,
        root: &dyn Operation,
        deadline: Duration,
    ) -> OperationResult {
        self.run(root, Some(deadline)).await
    }

    async fn run(&self, root: &dyn Operation, deadline: Option<Duration>) -> OperationResult {
        let ctx = self.context();
        info!(
            operation = %root.name(),
            pool_size = self.config.pool_size,
            "batch started"
        );
        self.event_sink
            .emit(Event::BatchStarted {
                id: root.id(),
                name: root.name().to_string(),
                pool_size: self.config.pool_size,
            })
            .await;

        let started = Instant::now();
        let exec = root.execute(&ctx);
        let result = match deadline {
            None => exec.await,
            Some(deadline) => {
                tokio::pin!(exec);
                tokio::select! {
                    res = &mut exec => res,
                    _ = tokio::time::sleep(deadline) => {
                        warn!(
                            operation = %root.name(),
                            deadline_ms = deadline.as_millis() as u64,
                            "deadline elapsed, cancelling batch"
                        );
                        root.cancel();
                        exec.await
                    }
                }
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            operation = %root.name(),
            status = %result.status,
            errors = result.errors.len(),
            duration_ms,
            "batch finished"
        );
        self.event_sink
            .emit(Event::BatchFinished {
                id: root.id(),
                name: root.name().to_string(),
                status: result.status,
                errors: result.errors.len(),
                duration_ms,
            })
            .await;
        result
    }
}
