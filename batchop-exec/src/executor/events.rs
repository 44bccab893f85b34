use std::sync::Arc;

use async_trait::async_trait;
use batchop_core::OperationStatus;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BatchStarted {
        id: Uuid,
        name: String,
        pool_size: usize,
    },
    BatchFinished {
        id: Uuid,
        name: String,
        status: OperationStatus,
        errors: usize,
        duration_ms: u64,
    },
    /// Leaves emit this only once they hold a pool slot.
    OperationStarted {
        id: Uuid,
        name: String,
    },
    OperationSucceeded {
        id: Uuid,
        name: String,
    },
    OperationFailed {
        id: Uuid,
        name: String,
        errors: usize,
    },
    OperationCancelled {
        id: Uuid,
        name: String,
    },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::BatchStarted { .. } => "batch.started",
            Event::BatchFinished { .. } => "batch.finished",
            Event::OperationStarted { .. } => "operation.started",
            Event::OperationSucceeded { .. } => "operation.succeeded",
            Event::OperationFailed { .. } => "operation.failed",
            Event::OperationCancelled { .. } => "operation.cancelled",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Event::BatchStarted { name, .. }
            | Event::BatchFinished { name, .. }
            | Event::OperationStarted { name, .. }
            | Event::OperationSucceeded { name, .. }
            | Event::OperationFailed { name, .. }
            | Event::OperationCancelled { name, .. } => name,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let ty = self.event_type();
        match self {
            Event::BatchStarted { id, name, pool_size } => {
                json!({ "type": ty, "id": id.to_string(), "name": name, "pool_size": pool_size })
            }
            Event::BatchFinished {
                id,
                name,
                status,
                errors,
                duration_ms,
            } => json!({
                "type": ty,
                "id": id.to_string(),
                "name": name,
                "status": status.as_str(),
                "errors": errors,
                "duration_ms": duration_ms,
            }),
            Event::OperationStarted { id, name }
            | Event::OperationSucceeded { id, name }
            | Event::OperationCancelled { id, name } => {
                json!({ "type": ty, "id": id.to_string(), "name": name })
            }
            Event::OperationFailed { id, name, errors } => {
                json!({ "type": ty, "id": id.to_string(), "name": name, "errors": errors })
            }
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

/// Forwards events to `tracing`, at `info` for batch boundaries and
/// `debug` for individual nodes.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::BatchStarted { id, name, pool_size } => {
                tracing::info!(%id, operation = %name, pool_size, "batch started");
            }
            Event::BatchFinished {
                id,
                name,
                status,
                errors,
                duration_ms,
            } => {
                tracing::info!(
                    %id,
                    operation = %name,
                    %status,
                    errors,
                    duration_ms,
                    "batch finished"
                );
            }
            Event::OperationFailed { id, name, errors } => {
                tracing::debug!(%id, operation = %name, errors, "operation failed");
            }
            Event::OperationCancelled { id, name } => {
                tracing::debug!(%id, operation = %name, "operation cancelled");
            }
            Event::OperationStarted { id, name } | Event::OperationSucceeded { id, name } => {
                tracing::debug!(%id, operation = %name, event = event.event_type());
            }
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: Event) {
        self.events.lock().await.push(event);
    }
}
