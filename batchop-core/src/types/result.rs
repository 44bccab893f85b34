use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::types::status::OperationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Action,
    Cancelled,
    Compensation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Action => "action",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Compensation => "compensation",
        }
    }
}

/// One failure, attributed to the leaf that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub operation: String,
    pub kind: FailureKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Failure {
    pub fn action(operation: impl Into<String>, err: &ActionError) -> Self {
        Self::new(operation, FailureKind::Action, err.chain_message())
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        let message = format!("operation '{operation}' was cancelled");
        Self::new(operation, FailureKind::Cancelled, message)
    }

    pub fn compensation(operation: impl Into<String>, err: &ActionError) -> Self {
        Self::new(
            operation,
            FailureKind::Compensation,
            format!("compensation failed: {}", err.chain_message()),
        )
    }

    fn new(operation: impl Into<String>, kind: FailureKind, message: String) -> Self {
        Self {
            operation: operation.into(),
            kind,
            message,
            at: Utc::now(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.operation, self.message)
    }
}

/// Status plus accumulated failures for one node.
///
/// Failures are kept in detection order. The mutators below never move a
/// terminal result back to a non-terminal state and only record failures
/// on a `Failure` status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: OperationStatus,
    pub errors: Vec<Failure>,
}

impl OperationResult {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }

    /// `Pending -> InProgress`. Returns false if the node had already started.
    pub fn begin(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = OperationStatus::InProgress;
        true
    }

    /// `InProgress -> Success`. Returns false if the transition was not allowed.
    pub fn succeed(&mut self) -> bool {
        if self.status != OperationStatus::InProgress {
            return false;
        }
        self.status = OperationStatus::Success;
        true
    }

    /// Moves a non-terminal result to `Failure` and records `failure`.
    pub fn fail(&mut self, failure: Failure) -> bool {
        if self.is_complete() {
            return false;
        }
        self.status = OperationStatus::Failure;
        self.errors.push(failure);
        true
    }

    /// Moves a non-terminal result to `Failure` without a failure record.
    pub fn force_failure(&mut self) {
        if !self.is_complete() {
            self.status = OperationStatus::Failure;
        }
    }

    /// Appends to an already failed result.
    pub fn append_failure(&mut self, failure: Failure) -> bool {
        if self.status != OperationStatus::Failure {
            return false;
        }
        self.errors.push(failure);
        true
    }

    /// Final aggregation step for a composite.
    ///
    /// An in-progress result becomes `Success` iff `all_success`; a result
    /// already forced to `Failure` stays there. Child failures are appended
    /// in the order given.
    pub fn finish_aggregate(&mut self, all_success: bool, failures: Vec<Failure>) {
        match self.status {
            OperationStatus::InProgress => {
                self.status = if all_success && failures.is_empty() {
                    OperationStatus::Success
                } else {
                    OperationStatus::Failure
                };
            }
            OperationStatus::Failure => {}
            OperationStatus::Pending | OperationStatus::Success => return,
        }
        if self.status == OperationStatus::Failure {
            self.errors.extend(failures);
        }
    }
}
