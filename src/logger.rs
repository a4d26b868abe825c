//! Per-attempt observation hooks.
//!
//! The client reports every outgoing attempt and its outcome to an
//! [`AttemptLogger`]. Loggers observe only: they return nothing and cannot
//! change how the retry loop proceeds.

use std::{sync::Arc, time::Duration};

use crate::{ClientError, PreparedRequest, Response};

/// Observer for individual attempts made by a [`ResilientClient`](crate::ResilientClient).
///
/// Implementations are shared between concurrent calls and must be cheap;
/// they run inline on the calling task.
pub trait AttemptLogger: Send + Sync {
    /// An attempt is about to be handed to the transport.
    fn on_request(&self, request: &PreparedRequest, attempt: u32);

    /// An attempt produced a 2xx response. This is the final call for a `send`.
    fn on_response(&self, response: &Response, request: &PreparedRequest, attempt: u32);

    /// An attempt failed. The client may or may not retry afterwards.
    fn on_failure(&self, error: &ClientError, request: &PreparedRequest, attempt: u32);
}

impl<L: AttemptLogger + ?Sized> AttemptLogger for Arc<L> {
    fn on_request(&self, request: &PreparedRequest, attempt: u32) {
        (**self).on_request(request, attempt);
    }

    fn on_response(&self, response: &Response, request: &PreparedRequest, attempt: u32) {
        (**self).on_response(response, request, attempt);
    }

    fn on_failure(&self, error: &ClientError, request: &PreparedRequest, attempt: u32) {
        (**self).on_failure(error, request, attempt);
    }
}

/// Default logger: emits `tracing` events under the
/// `resilient_http::attempt` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl AttemptLogger for TracingLogger {
    fn on_request(&self, request: &PreparedRequest, attempt: u32) {
        tracing::debug!(
            target: "resilient_http::attempt",
            attempt,
            method = %request.method,
            url = %request.url,
            timeout_ms = saturating_millis(request.timeout),
            "sending request"
        );
    }

    fn on_response(&self, response: &Response, request: &PreparedRequest, attempt: u32) {
        tracing::debug!(
            target: "resilient_http::attempt",
            attempt,
            method = %request.method,
            url = %request.url,
            status = response.status,
            "received response"
        );
    }

    fn on_failure(&self, error: &ClientError, request: &PreparedRequest, attempt: u32) {
        tracing::warn!(
            target: "resilient_http::attempt",
            attempt,
            method = %request.method,
            url = %request.url,
            status = error.status(),
            error = %error,
            "request attempt failed"
        );
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl AttemptLogger for NoopLogger {
    fn on_request(&self, _request: &PreparedRequest, _attempt: u32) {}

    fn on_response(&self, _response: &Response, _request: &PreparedRequest, _attempt: u32) {}

    fn on_failure(&self, _error: &ClientError, _request: &PreparedRequest, _attempt: u32) {}
}
