use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity pool shared by every node of one engine.
///
/// Clones share the same bound, so nested parallel composites draw from a
/// single budget instead of multiplying it.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub async fn acquire(&self) -> PoolPermit {
        // The semaphore is owned here and never closed, so acquire cannot fail
        // unless there is a bug.
        let permit = self.permits.clone().acquire_owned().await.unwrap_or_else(|_| {
            panic!("worker pool semaphore closed unexpectedly. This is a bug - please report it.");
        });
        PoolPermit { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// Slot in the pool, released on drop.
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
}
