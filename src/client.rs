use std::{fmt, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    logger::{saturating_millis, AttemptLogger, TracingLogger},
    options::{RetryConfiguration, RetrySettings},
    policy::RetryPolicy,
    sleep::{Sleeper, TokioSleeper},
    transport::{ReqwestTransport, Transport},
    ClientError, Request, Response, Result,
};

/// HTTP client that retries transient failures with backoff.
///
/// Cloning is cheap; clones share the transport, logger and configuration.
/// Concurrent calls through one client are independent of each other.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    logger: Arc<dyn AttemptLogger>,
    sleeper: Arc<dyn Sleeper>,
    configuration: RetryConfiguration,
    policy: RetryPolicy,
}

impl fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientClient")
            .field("transport", &"<transport>")
            .field("logger", &"<logger>")
            .field("configuration", &self.configuration)
            .finish()
    }
}

impl Default for ResilientClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ResilientClient {
    /// Creates a `reqwest`-backed client with default configuration and
    /// `tracing` attempt logs.
    pub fn new() -> Self {
        let configuration = RetryConfiguration::default();
        Self {
            transport: Arc::new(ReqwestTransport::new()),
            logger: Arc::new(TracingLogger),
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::new(configuration.backoff.clone()),
            configuration,
        }
    }

    /// Creates a `reqwest`-backed client configured from environment variables.
    ///
    /// See [`RetrySettings::from_env`] for the variables read. Returns an
    /// error if a variable is set to an invalid value.
    pub fn from_env() -> std::result::Result<Self, String> {
        let configuration = RetryConfiguration::try_from(RetrySettings::from_env()?)?;
        Ok(Self::new().with_configuration(configuration))
    }

    /// Applies timeout, retry budget and backoff settings.
    pub fn with_configuration(mut self, configuration: RetryConfiguration) -> Self {
        self.policy = RetryPolicy::new(configuration.backoff.clone());
        self.configuration = configuration;
        self
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_logger(mut self, logger: impl AttemptLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn configuration(&self) -> &RetryConfiguration {
        &self.configuration
    }

    /// Shorthand for sending [`Request::get`].
    pub async fn get(&self, url: impl Into<String>) -> Result<Response> {
        self.send(&Request::get(url)).await
    }

    /// Sends `request`, retrying server errors and transient transport
    /// failures until it succeeds or the retry budget runs out.
    ///
    /// On failure the error from the last attempt is returned unchanged.
    pub async fn send(&self, request: &Request) -> Result<Response> {
        self.send_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), but stops with [`ClientError::Cancelled`]
    /// as soon as `cancel` fires, whether an exchange or a backoff delay is
    /// in progress. No attempt starts after cancellation.
    pub async fn send_with_cancellation(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let max_retries = request
            .max_retries
            .unwrap_or(self.configuration.max_retries);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(attempt, url = %request.url, "request cancelled before attempt");
                return Err(ClientError::Cancelled);
            }

            attempt += 1;
            let prepared = request.prepare(self.configuration.default_timeout);
            self.logger.on_request(&prepared, attempt);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, url = %request.url, "request cancelled during exchange");
                    let error = ClientError::Cancelled;
                    self.logger.on_failure(&error, &prepared, attempt);
                    return Err(error);
                }
                outcome = self.transport.exchange(&prepared) => outcome,
            };

            let error = match outcome {
                Err(err) => ClientError::Transport(err),
                Ok(raw) => match raw.interpret() {
                    None => ClientError::InvalidResponse,
                    Some(response) if (200..=299).contains(&response.status) => {
                        self.logger.on_response(&response, &prepared, attempt);
                        return Ok(response);
                    }
                    Some(response) => ClientError::UnacceptableStatus {
                        status: response.status,
                        body: response.body,
                    },
                },
            };

            self.logger.on_failure(&error, &prepared, attempt);

            if attempt > max_retries || !self.policy.should_retry(&error) {
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            if delay.is_zero() {
                continue;
            }

            tracing::debug!(
                attempt,
                delay_ms = saturating_millis(delay),
                url = %request.url,
                "retrying request after backoff"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, url = %request.url, "request cancelled during backoff");
                    return Err(ClientError::Cancelled);
                }
                _ = self.sleeper.sleep(delay) => {}
            }
        }
    }
}
