//! Per-request cancellation and deadline.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::RequestError;

/// Cancellation and deadline inherited from the caller of an exchange.
///
/// The handler never sets its own timeout; it only honors what the caller
/// put here.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Attach a deadline relative to now.
    ///
    /// A timeout too large to represent leaves the request without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Fail if the request was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), RequestError> {
        if self.cancel.is_cancelled() {
            return Err(RequestError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(RequestError::Timeout),
            _ => Ok(()),
        }
    }

    /// Resolves once the request is cancelled or the deadline passes.
    pub async fn done(&self) -> RequestError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancel.cancelled() => RequestError::Canceled,
                _ = tokio::time::sleep_until(deadline) => RequestError::Timeout,
            },
            None => {
                self.cancel.cancelled().await;
                RequestError::Canceled
            }
        }
    }
}
