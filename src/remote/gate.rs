//! Bounded-concurrency gate.
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Counting gate capping the number of simultaneous outbound requests.
///
/// Hold the permit returned by [Gate::enter] for the whole request.
#[derive(Debug)]
pub struct Gate {
    permits: Semaphore,
    limit: usize,
}

impl Gate {
    /// A limit of 0 is raised to 1.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Semaphore::new(limit),
            limit,
        }
    }

    pub async fn enter(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.permits.acquire().await
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of requests that could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
