use batchop_core::{
    ExecutionStrategy, Failure, OperationKind, OperationReport, OperationStatus,
};
use uuid::Uuid;

fn leaf(name: &str, status: OperationStatus) -> OperationReport {
    OperationReport {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind: OperationKind::Leaf,
        strategy: None,
        status,
        progress: if status.is_terminal() { 100.0 } else { 0.0 },
        errors: if status == OperationStatus::Failure {
            vec![Failure::cancelled(name)]
        } else {
            Vec::new()
        },
        children: Vec::new(),
    }
}

fn composite(name: &str, children: Vec<OperationReport>) -> OperationReport {
    OperationReport {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind: OperationKind::Composite,
        strategy: Some(ExecutionStrategy::Parallel),
        status: OperationStatus::InProgress,
        progress: 50.0,
        errors: Vec::new(),
        children,
    }
}

#[test]
fn counts_only_leaves_across_subtree() {
    let report = composite(
        "root",
        vec![
            leaf("a", OperationStatus::Success),
            composite(
                "inner",
                vec![
                    leaf("b", OperationStatus::InProgress),
                    leaf("c", OperationStatus::Failure),
                ],
            ),
            leaf("d", OperationStatus::Pending),
        ],
    );

    let counts = report.count_by_status();
    assert_eq!(counts.total(), 4);
    assert_eq!(counts.success, 1);
    assert_eq!(counts.in_progress, 1);
    assert_eq!(counts.failure, 1);
    assert_eq!(counts.pending, 1);
}

#[test]
fn find_walks_depth_first() {
    let report = composite(
        "root",
        vec![composite("inner", vec![leaf("b", OperationStatus::Success)])],
    );
    assert_eq!(report.find("b").map(|r| r.status), Some(OperationStatus::Success));
    assert!(report.find("missing").is_none());
}

#[test]
fn json_shape_omits_empty_fields() {
    let report = leaf("a", OperationStatus::Success);
    let json = report.to_json();
    assert_eq!(json["name"], "a");
    assert_eq!(json["kind"], "leaf");
    assert_eq!(json["status"], "SUCCESS");
    assert!(json.get("errors").is_none());
    assert!(json.get("children").is_none());
    assert!(json.get("strategy").is_none());

    let parent = composite("root", vec![report]);
    let json = parent.to_json();
    assert_eq!(json["strategy"], "parallel");
    assert_eq!(json["children"][0]["name"], "a");
}
