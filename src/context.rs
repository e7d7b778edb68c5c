use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::db::StoreError;

/// Per-request deadline threaded through the workflow and the store.
/// `RequestContext::default()` has no deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, `None` when there is none.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Drive a store call to completion or fail with `Cancelled` once the
    /// deadline passes. The call's future is dropped on expiry.
    pub async fn run<F, T>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if self.is_expired() {
            return Err(StoreError::Cancelled);
        }

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, call)
                .await
                .map_err(|_| StoreError::Cancelled)?,
            None => call.await,
        }
    }
}
