use std::{error::Error as StdError, io, sync::Arc};

use async_trait::async_trait;

use crate::{PreparedRequest, RawResponse, TransportError, TransportErrorKind};

/// A single request/response exchange.
///
/// Implementations perform exactly one exchange per call and never retry on
/// their own. Any status code is a successful exchange; only failures below
/// HTTP are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        request: &PreparedRequest,
    ) -> std::result::Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn exchange(
        &self,
        request: &PreparedRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        (**self).exchange(request).await
    }
}

/// [`Transport`] backed by a `reqwest` connection pool.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots, pool sizes).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn exchange(
        &self,
        request: &PreparedRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.into(), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
            .collect();
        let body = response.bytes().await.map_err(classify_reqwest_error)?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Wraps a `reqwest` failure, tagging it with the matching transport kind.
pub fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = reqwest_error_kind(&err);
    TransportError::with_source(kind, err)
}

fn reqwest_error_kind(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::TimedOut;
    }
    if err.is_builder() {
        return TransportErrorKind::BadUrl;
    }
    if err.is_redirect() {
        return TransportErrorKind::TooManyRedirects;
    }
    if let Some(kind) = source_chain_kind(err) {
        return kind;
    }
    if err.is_connect() {
        return TransportErrorKind::CannotConnectToHost;
    }
    if err.is_body() || err.is_request() {
        return TransportErrorKind::NetworkConnectionLost;
    }
    TransportErrorKind::Other
}

// hyper-util reports resolver failures as a `ConnectError` whose message
// starts with "dns error"; the wrapped io error carries no usable kind.
fn source_chain_kind(err: &(dyn StdError + 'static)) -> Option<TransportErrorKind> {
    let mut current = err.source();
    while let Some(cause) = current {
        if cause.to_string().starts_with("dns error") {
            return Some(TransportErrorKind::DnsLookupFailed);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            let kind = TransportErrorKind::from_io(io_err.kind());
            if kind != TransportErrorKind::Other {
                return Some(kind);
            }
        }
        current = cause.source();
    }
    None
}
