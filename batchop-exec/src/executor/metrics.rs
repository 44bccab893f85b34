use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use batchop_core::OperationStatus;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::executor::{Event, EventSink};

#[derive(Debug, Clone, Default)]
pub struct BatchMetrics {
    pub batch_id: Option<Uuid>,
    pub name: String,
    pub status: Option<OperationStatus>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration: Option<Duration>,
    pub operations_started: usize,
    pub operations_succeeded: usize,
    pub operations_failed: usize,
    pub operations_cancelled: usize,
    pub failures: usize,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, batch_id: Uuid, name: String) {
        self.batch_id = Some(batch_id);
        self.name = name;
        self.started_at = Some(Instant::now());
    }

    pub fn record_started(&mut self) {
        self.operations_started += 1;
    }

    pub fn record_success(&mut self) {
        self.operations_succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.operations_failed += 1;
    }

    pub fn record_cancelled(&mut self) {
        self.operations_cancelled += 1;
    }

    pub fn finish(&mut self, status: OperationStatus, failures: usize) {
        self.status = Some(status);
        self.failures = failures;
        self.finished_at = Some(Instant::now());
        if let (Some(started), Some(finished)) = (self.started_at, self.finished_at) {
            self.total_duration = Some(finished.duration_since(started));
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "batch_id": self.batch_id.map(|id| id.to_string()),
            "name": self.name,
            "status": self.status.map(|s| s.as_str()),
            "duration_ms": self.total_duration.map(|d| d.as_millis() as u64),
            "operations": {
                "started": self.operations_started,
                "succeeded": self.operations_succeeded,
                "failed": self.operations_failed,
                "cancelled": self.operations_cancelled,
            },
            "failures": self.failures,
        })
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<BatchMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self, batch_id: Uuid, name: String) {
        self.metrics.lock().await.start(batch_id, name);
    }

    pub async fn record_started(&self) {
        self.metrics.lock().await.record_started();
    }

    pub async fn record_success(&self) {
        self.metrics.lock().await.record_success();
    }

    pub async fn record_failure(&self) {
        self.metrics.lock().await.record_failure();
    }

    pub async fn record_cancelled(&self) {
        self.metrics.lock().await.record_cancelled();
    }

    pub async fn finish(&self, status: OperationStatus, failures: usize) {
        self.metrics.lock().await.finish(status, failures);
    }

    pub async fn get_metrics(&self) -> BatchMetrics {
        self.metrics.lock().await.clone()
    }
}

pub struct MetricsEventSink {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink>,
}

impl MetricsEventSink {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink>) -> Self {
        Self { collector, base }
    }
}

#[async_trait]
impl EventSink for MetricsEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::BatchStarted { id, name, .. } => {
                self.collector.start(*id, name.clone()).await;
            }
            Event::OperationStarted { .. } => {
                self.collector.record_started().await;
            }
            Event::OperationSucceeded { .. } => {
                self.collector.record_success().await;
            }
            Event::OperationFailed { .. } => {
                self.collector.record_failure().await;
            }
            Event::OperationCancelled { .. } => {
                self.collector.record_cancelled().await;
            }
            Event::BatchFinished { status, errors, .. } => {
                self.collector.finish(*status, *errors).await;
            }
        }

        self.base.emit(event).await;
    }
}
