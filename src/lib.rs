//! `resilient-http` is an async HTTP client that retries transient failures.
//!
//! [`ResilientClient::send`] issues a [`Request`] through a pluggable
//! [`Transport`], classifies each failure and retries server errors (5xx)
//! and transient network conditions with exponential backoff. Every attempt
//! is reported to an [`AttemptLogger`].
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use resilient_http::{Request, ResilientClient, RetryConfiguration};
//!
//! # async fn run() -> resilient_http::Result<()> {
//! let client = ResilientClient::new()
//!     .with_configuration(RetryConfiguration::default().with_max_retries(3));
//!
//! let response = client
//!     .send(
//!         &Request::get("https://openlibrary.org/isbn/9784003101018.json")
//!             .header("accept", "application/json")
//!             .timeout(Duration::from_secs(10)),
//!     )
//!     .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod logger;
mod options;
mod policy;
mod sleep;
mod transport;
mod types;

pub use client::ResilientClient;
pub use error::{ClientError, TransportError, TransportErrorKind};
pub use logger::{AttemptLogger, NoopLogger, TracingLogger};
pub use options::{Backoff, RetryConfiguration, RetrySettings};
pub use policy::RetryPolicy;
pub use sleep::{Sleeper, TokioSleeper};
pub use transport::{classify_reqwest_error, ReqwestTransport, Transport};
pub use types::{CacheDirective, Method, PreparedRequest, RawResponse, Request, Response};

/// Re-exported so callers can cancel in-flight sends without a direct
/// `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ClientError>;
