use std::sync::Arc;
use std::time::Duration;

use batchop_core::StatusCounts;
use batchop_exec::{CompositeOperation, Operation};
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Redraws a progress line on stderr by polling the tree's report while it
/// executes.
///
/// The `→` figure counts IN_PROGRESS leaves, which includes leaves still
/// queued for a pool slot as well as those whose action is running.
pub struct ProgressReporter {
    root: Arc<CompositeOperation>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    pub fn spawn(root: Arc<CompositeOperation>) -> Self {
        let polled = root.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                let counts = polled.report().count_by_status();
                eprint!("\r{}", render(&counts));
            }
        });
        Self { root, handle }
    }

    /// Stops polling and prints the final state on its own line.
    pub fn finish(self) {
        self.handle.abort();
        let counts = self.root.report().count_by_status();
        eprintln!("\r{}", render(&counts));
    }
}

fn render(counts: &StatusCounts) -> String {
    let done = counts.success + counts.failure;
    let total = counts.total();
    let percent = if total > 0 { (done * 100) / total } else { 100 };
    format!(
        "Progress: [{}/{}] {}% (✓{} ✗{} →{})",
        done,
        total,
        percent,
        counts.success,
        counts.failure,
        counts.in_progress
    )
}
