use std::sync::Arc;

use batchop_exec::executor::{
    BatchMetrics, CollectingEventSink, Event, EventSink, MetricsCollector, MetricsEventSink,
};
use batchop_exec::OperationStatus;
use uuid::Uuid;

#[test]
fn batch_metrics_start() {
    let mut metrics = BatchMetrics::new();
    metrics.start(Uuid::new_v4(), "bulk-update".to_string());
    assert_eq!(metrics.name, "bulk-update");
    assert!(metrics.started_at.is_some());
    assert_eq!(metrics.operations_started, 0);
}

#[test]
fn batch_metrics_record_outcomes() {
    let mut metrics = BatchMetrics::new();
    metrics.record_started();
    metrics.record_started();
    metrics.record_started();
    metrics.record_success();
    metrics.record_failure();
    metrics.record_cancelled();
    assert_eq!(metrics.operations_started, 3);
    assert_eq!(metrics.operations_succeeded, 1);
    assert_eq!(metrics.operations_failed, 1);
    assert_eq!(metrics.operations_cancelled, 1);
}

#[test]
fn batch_metrics_finish() {
    let mut metrics = BatchMetrics::new();
    metrics.start(Uuid::new_v4(), "bulk-update".to_string());
    std::thread::sleep(std::time::Duration::from_millis(10));
    metrics.finish(OperationStatus::Failure, 2);
    assert_eq!(metrics.status, Some(OperationStatus::Failure));
    assert_eq!(metrics.failures, 2);
    assert!(metrics.finished_at.is_some());
    assert!(metrics.total_duration.is_some());
}

#[test]
fn metrics_to_json() {
    let mut metrics = BatchMetrics::new();
    metrics.start(Uuid::new_v4(), "bulk-update".to_string());
    metrics.record_started();
    metrics.record_success();
    metrics.finish(OperationStatus::Success, 0);

    let json = metrics.to_json();
    assert_eq!(json["name"], "bulk-update");
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["operations"]["started"], 1);
    assert_eq!(json["operations"]["succeeded"], 1);
    assert_eq!(json["failures"], 0);
}

#[tokio::test]
async fn metrics_sink_counts_and_forwards() {
    let collector = Arc::new(MetricsCollector::new());
    let base = Arc::new(CollectingEventSink::new());
    let sink = MetricsEventSink::new(collector.clone(), base.clone());
    let id = Uuid::new_v4();

    sink.emit(Event::BatchStarted { id, name: "root".to_string(), pool_size: 2 }).await;
    sink.emit(Event::OperationStarted { id, name: "a".to_string() }).await;
    sink.emit(Event::OperationFailed { id, name: "a".to_string(), errors: 1 }).await;
    sink.emit(Event::OperationCancelled { id, name: "b".to_string() }).await;
    sink.emit(Event::BatchFinished {
        id,
        name: "root".to_string(),
        status: OperationStatus::Failure,
        errors: 2,
        duration_ms: 5,
    })
    .await;

    let metrics = collector.get_metrics().await;
    assert_eq!(metrics.batch_id, Some(id));
    assert_eq!(metrics.operations_started, 1);
    assert_eq!(metrics.operations_failed, 1);
    assert_eq!(metrics.operations_cancelled, 1);
    assert_eq!(metrics.failures, 2);
    assert_eq!(base.events().await.len(), 5);
}
