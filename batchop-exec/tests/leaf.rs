use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchop_exec::executor::{CollectingEventSink, Event, WorkerPool};
use batchop_exec::{
    action_fn, Action, ActionError, ExecutionContext, FailureKind, LeafOperation, Operation,
    OperationStatus,
};
use serde_json::json;

/// Sleeps, counts runs and compensations, and fails on demand.
struct SimAction {
    delay: Duration,
    fail: bool,
    fail_compensation: bool,
    runs: Arc<AtomicUsize>,
    compensations: Arc<AtomicUsize>,
}

impl SimAction {
    fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            fail: false,
            fail_compensation: false,
            runs: Arc::new(AtomicUsize::new(0)),
            compensations: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Action for SimAction {
    async fn run(&self, payload: &serde_json::Value) -> Result<(), ActionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(ActionError::new(format!("remote call failed for {payload}")));
        }
        Ok(())
    }

    async fn compensate(&self, _payload: &serde_json::Value) -> Result<(), ActionError> {
        self.compensations.fetch_add(1, Ordering::SeqCst);
        if self.fail_compensation {
            return Err(ActionError::new("undo rejected"));
        }
        Ok(())
    }
}

struct PanickingAction;

#[async_trait]
impl Action for PanickingAction {
    async fn run(&self, _payload: &serde_json::Value) -> Result<(), ActionError> {
        panic!("connection pool poisoned");
    }
}

fn ctx() -> ExecutionContext {
    ExecutionContext::with_pool_size(4)
}

#[tokio::test]
async fn successful_leaf_reaches_success_without_errors() {
    let leaf = LeafOperation::new("user-service", json!({"user_id": 1}), SimAction::new(0));
    assert_eq!(leaf.get_status(), OperationStatus::Pending);

    let result = leaf.execute(&ctx()).await;

    assert_eq!(result.status, OperationStatus::Success);
    assert!(result.errors.is_empty());
    assert_eq!(leaf.get_status(), OperationStatus::Success);
    assert_eq!(leaf.payload()["user_id"], 1);
}

#[tokio::test]
async fn failing_leaf_captures_one_error_as_data() {
    let mut action = SimAction::new(0);
    action.fail = true;
    let leaf = LeafOperation::new("inventory-service", json!({"sku": "A1"}), action);

    let result = leaf.execute(&ctx()).await;

    assert_eq!(result.status, OperationStatus::Failure);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, FailureKind::Action);
    assert_eq!(result.errors[0].operation, "inventory-service");
    assert!(result.errors[0].message.contains("A1"));
}

#[tokio::test]
async fn panicking_action_becomes_failure() {
    let leaf = LeafOperation::new("billing-service", json!({}), PanickingAction);

    let result = leaf.execute(&ctx()).await;

    assert_eq!(result.status, OperationStatus::Failure);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("connection pool poisoned"));
}

#[tokio::test]
async fn closure_actions_receive_payload() {
    let seen = Arc::new(AtomicUsize::new(0));
    let leaf = {
        let seen = seen.clone();
        LeafOperation::new(
            "user-service",
            json!({"user_id": 7}),
            action_fn(move |payload| {
                let seen = seen.clone();
                async move {
                    let id = payload["user_id"].as_u64().ok_or("missing user_id")?;
                    seen.store(id as usize, Ordering::SeqCst);
                    Ok::<(), ActionError>(())
                }
            }),
        )
    };

    let result = leaf.execute(&ctx()).await;

    assert_eq!(result.status, OperationStatus::Success);
    assert_eq!(seen.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn second_execute_does_not_rerun_action() {
    let action = SimAction::new(0);
    let runs = action.runs.clone();
    let leaf = LeafOperation::new("user-service", json!({}), action);
    let ctx = ctx();

    leaf.execute(&ctx).await;
    let again = leaf.execute(&ctx).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(again.status, OperationStatus::Success);
}

#[tokio::test]
async fn cancel_before_start_is_noop() {
    let leaf = LeafOperation::new("user-service", json!({}), SimAction::new(0));
    leaf.cancel();
    assert_eq!(leaf.get_status(), OperationStatus::Pending);

    let result = leaf.execute(&ctx()).await;
    assert_eq!(result.status, OperationStatus::Success);
}

#[tokio::test]
async fn cancel_after_completion_is_noop() {
    let leaf = LeafOperation::new("user-service", json!({}), SimAction::new(0));
    leaf.execute(&ctx()).await;
    leaf.cancel();
    assert_eq!(leaf.get_status(), OperationStatus::Success);
    assert!(leaf.result().errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_wins_over_in_flight_success_and_compensates() {
    let action = SimAction::new(1_000);
    let compensations = action.compensations.clone();
    let leaf = Arc::new(LeafOperation::new("billing-service", json!({}), action));

    let handle = {
        let leaf = leaf.clone();
        tokio::spawn(async move { leaf.execute(&ExecutionContext::with_pool_size(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(leaf.get_status(), OperationStatus::InProgress);

    leaf.cancel();
    assert_eq!(leaf.get_status(), OperationStatus::Failure);

    let result = handle.await.unwrap();
    assert_eq!(result.status, OperationStatus::Failure);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, FailureKind::Cancelled);
    assert_eq!(compensations.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_compensation_is_recorded_after_cancellation() {
    let mut action = SimAction::new(1_000);
    action.fail_compensation = true;
    let leaf = Arc::new(LeafOperation::new("billing-service", json!({}), action));

    let handle = {
        let leaf = leaf.clone();
        tokio::spawn(async move { leaf.execute(&ExecutionContext::with_pool_size(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    leaf.cancel();

    let result = handle.await.unwrap();
    let kinds: Vec<FailureKind> = result.errors.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FailureKind::Cancelled, FailureKind::Compensation]);
}

#[tokio::test(start_paused = true)]
async fn in_flight_failure_after_cancel_is_discarded() {
    let mut action = SimAction::new(1_000);
    action.fail = true;
    let compensations = action.compensations.clone();
    let leaf = Arc::new(LeafOperation::new("inventory-service", json!({}), action));

    let handle = {
        let leaf = leaf.clone();
        tokio::spawn(async move { leaf.execute(&ExecutionContext::with_pool_size(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    leaf.cancel();

    let result = handle.await.unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, FailureKind::Cancelled);
    assert_eq!(compensations.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn leaf_cancelled_while_queued_never_runs() {
    let sink = Arc::new(CollectingEventSink::new());
    let ctx = ExecutionContext::new(WorkerPool::new(1), sink.clone());

    let blocker = Arc::new(LeafOperation::new("blocker", json!({}), SimAction::new(1_000)));
    let queued_action = SimAction::new(0);
    let queued_runs = queued_action.runs.clone();
    let queued = Arc::new(LeafOperation::new("queued", json!({}), queued_action));

    let h1 = {
        let (leaf, ctx) = (blocker.clone(), ctx.clone());
        tokio::spawn(async move { leaf.execute(&ctx).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let h2 = {
        let (leaf, ctx) = (queued.clone(), ctx.clone());
        tokio::spawn(async move { leaf.execute(&ctx).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(queued.get_status(), OperationStatus::InProgress);

    queued.cancel();
    let queued_result = h2.await.unwrap();
    let blocker_result = h1.await.unwrap();

    assert_eq!(queued_runs.load(Ordering::SeqCst), 0);
    assert_eq!(queued_result.errors[0].kind, FailureKind::Cancelled);
    assert_eq!(blocker_result.status, OperationStatus::Success);

    let events = sink.events().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::OperationCancelled { name, .. } if name == "queued")));
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::OperationStarted { name, .. } if name == "queued")));
}

#[tokio::test]
async fn leaf_emits_lifecycle_events() {
    let sink = Arc::new(CollectingEventSink::new());
    let ctx = ExecutionContext::new(WorkerPool::new(1), sink.clone());
    let leaf = LeafOperation::new("user-service", json!({}), SimAction::new(0));

    leaf.execute(&ctx).await;

    let types: Vec<&str> = sink
        .events()
        .await
        .iter()
        .map(|e| e.event_type())
        .collect();
    assert_eq!(types, vec!["operation.started", "operation.succeeded"]);
}

#[tokio::test]
async fn report_reflects_leaf_state() {
    let leaf = LeafOperation::new("user-service", json!({}), SimAction::new(0));
    assert_eq!(leaf.report().progress, 0.0);

    leaf.execute(&ctx()).await;
    let report = leaf.report();
    assert_eq!(report.status, OperationStatus::Success);
    assert_eq!(report.progress, 100.0);
    assert!(report.children.is_empty());
}
