//! Retry classification and backoff timing.
//!
//! Only server errors (5xx) and a fixed set of transient transport failures
//! are retried. Client errors (4xx), other non-2xx statuses, malformed
//! responses and cancellations are surfaced immediately.

use std::time::Duration;

use crate::{options::Backoff, ClientError};

/// Stateless retry decisions for one client.
#[derive(Clone, Debug, Default)]
pub struct RetryPolicy {
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(backoff: Backoff) -> Self {
        Self { backoff }
    }

    /// Whether `error` is worth another attempt. The retry budget is checked
    /// separately by the caller.
    pub fn should_retry(&self, error: &ClientError) -> bool {
        match error {
            ClientError::UnacceptableStatus { status, .. } => (500..=599).contains(status),
            ClientError::Transport(err) => err.is_transient(),
            ClientError::InvalidResponse | ClientError::Cancelled => false,
        }
    }

    /// Delay before retrying after attempt `attempt` (1-based) failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}
