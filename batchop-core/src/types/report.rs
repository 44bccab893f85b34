use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::result::Failure;
use crate::types::status::{ExecutionStrategy, OperationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Leaf,
    Composite,
}

/// Point-in-time view of a subtree, safe to take while it is executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    pub id: Uuid,
    pub name: String,
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ExecutionStrategy>,
    pub status: OperationStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<OperationReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub success: usize,
    pub failure: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.success + self.failure
    }

    fn record(&mut self, status: OperationStatus) {
        match status {
            OperationStatus::Pending => self.pending += 1,
            OperationStatus::InProgress => self.in_progress += 1,
            OperationStatus::Success => self.success += 1,
            OperationStatus::Failure => self.failure += 1,
        }
    }
}

impl OperationReport {
    /// Leaf statuses across the whole subtree.
    pub fn count_by_status(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        self.collect_counts(&mut counts);
        counts
    }

    fn collect_counts(&self, counts: &mut StatusCounts) {
        match self.kind {
            OperationKind::Leaf => counts.record(self.status),
            OperationKind::Composite => {
                for child in &self.children {
                    child.collect_counts(counts);
                }
            }
        }
    }

    /// Depth-first lookup by name; the first match wins.
    pub fn find(&self, name: &str) -> Option<&OperationReport> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
