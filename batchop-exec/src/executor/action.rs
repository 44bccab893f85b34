use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use batchop_core::ActionError;
use futures_util::FutureExt;

/// The external effect behind a leaf: one RPC, one storage write, and so on.
///
/// Retries, timeouts and client plumbing belong to the implementation, not
/// to the engine.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, payload: &serde_json::Value) -> Result<(), ActionError>;

    /// Undo hook, invoked when a leaf was cancelled while `run` went on to
    /// succeed anyway.
    async fn compensate(&self, _payload: &serde_json::Value) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Adapter for plain async closures.
pub struct FnAction<F> {
    f: F,
}

pub fn action_fn<F, Fut>(f: F) -> FnAction<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    FnAction { f }
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    async fn run(&self, payload: &serde_json::Value) -> Result<(), ActionError> {
        (self.f)(payload.clone()).await
    }
}

/// Runs `fut`, turning a panic into an [`ActionError`].
pub(crate) async fn catch_panic<Fut>(fut: Fut) -> Result<(), ActionError>
where
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(ActionError::new(format!("action panicked: {msg}")))
        }
    }
}
