use std::{error::Error as StdError, fmt, io, sync::Arc};

/// Error type returned by [`ResilientClient`](crate::ResilientClient).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The transport answered with something that cannot be read as an HTTP response.
    #[error("invalid http response")]
    InvalidResponse,
    /// A response arrived but its status is outside `200..=299`.
    #[error("unacceptable status {status}")]
    UnacceptableStatus {
        /// Numeric HTTP status code.
        status: u16,
        /// Raw response body, kept so callers can inspect error payloads.
        body: Vec<u8>,
    },
    /// The exchange itself failed below HTTP.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The caller cancelled the call while an exchange or backoff was pending.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Status code for [`ClientError::UnacceptableStatus`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnacceptableStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Identity of a transport-level failure.
///
/// The first group mirrors transient network conditions and is retried by
/// the default policy; see [`TransportErrorKind::is_transient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TransportErrorKind {
    TimedOut,
    CannotFindHost,
    CannotConnectToHost,
    NetworkConnectionLost,
    DnsLookupFailed,
    NotConnectedToInternet,
    InternationalRoamingOff,
    CallIsActive,
    DataNotAllowed,
    RequestBodyStreamExhausted,
    BackgroundSessionDisconnected,
    /// The request could not be built, usually a malformed URL.
    BadUrl,
    TooManyRedirects,
    Other,
}

impl TransportErrorKind {
    /// Whether this condition is expected to clear up without caller action.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::TimedOut
                | Self::CannotFindHost
                | Self::CannotConnectToHost
                | Self::NetworkConnectionLost
                | Self::DnsLookupFailed
                | Self::NotConnectedToInternet
                | Self::InternationalRoamingOff
                | Self::CallIsActive
                | Self::DataNotAllowed
                | Self::RequestBodyStreamExhausted
                | Self::BackgroundSessionDisconnected
        )
    }

    /// Maps an OS-level I/O failure onto a transport kind.
    pub fn from_io(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => {
                Self::CannotConnectToHost
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::NetworkConnectionLost,
            io::ErrorKind::NotConnected => Self::NotConnectedToInternet,
            _ => Self::Other,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::TimedOut => "operation timed out",
            Self::CannotFindHost => "cannot find host",
            Self::CannotConnectToHost => "cannot connect to host",
            Self::NetworkConnectionLost => "network connection lost",
            Self::DnsLookupFailed => "dns lookup failed",
            Self::NotConnectedToInternet => "not connected to the internet",
            Self::InternationalRoamingOff => "international roaming is off",
            Self::CallIsActive => "call is active",
            Self::DataNotAllowed => "cellular data not allowed",
            Self::RequestBodyStreamExhausted => "request body stream exhausted",
            Self::BackgroundSessionDisconnected => "background session disconnected",
            Self::BadUrl => "bad url",
            Self::TooManyRedirects => "too many redirects",
            Self::Other => "transport failure",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A failed exchange, carrying its [`TransportErrorKind`] and the opaque
/// underlying cause.
///
/// Two transport errors are equal when their kinds are equal. The wrapped
/// cause and its message take no part in the comparison.
#[derive(Clone)]
pub struct TransportError {
    kind: TransportErrorKind,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: TransportErrorKind,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            source: Some(Arc::from(source.into())),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl From<TransportErrorKind> for TransportError {
    fn from(kind: TransportErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        let kind = TransportErrorKind::from_io(err.kind());
        Self::with_source(kind, err)
    }
}

impl PartialEq for TransportError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for TransportError {}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("TransportError");
        debug.field("kind", &self.kind);
        if let Some(source) = &self.source {
            debug.field("source", source);
        }
        debug.finish()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error as _, io};

    use super::{ClientError, TransportError, TransportErrorKind};

    #[test]
    fn transport_errors_compare_by_kind_not_message() {
        let a = TransportError::with_source(
            TransportErrorKind::TimedOut,
            io::Error::new(io::ErrorKind::TimedOut, "first"),
        );
        let b = TransportError::with_source(
            TransportErrorKind::TimedOut,
            io::Error::new(io::ErrorKind::TimedOut, "second"),
        );
        let c = TransportError::with_source(
            TransportErrorKind::Other,
            io::Error::new(io::ErrorKind::TimedOut, "first"),
        );

        assert_eq!(ClientError::Transport(a.clone()), ClientError::Transport(b));
        assert_ne!(ClientError::Transport(a), ClientError::Transport(c));
    }

    #[test]
    fn unacceptable_status_compares_code_and_body() {
        let lhs = ClientError::UnacceptableStatus {
            status: 503,
            body: b"busy".to_vec(),
        };
        assert_eq!(
            lhs,
            ClientError::UnacceptableStatus {
                status: 503,
                body: b"busy".to_vec(),
            }
        );
        assert_ne!(
            lhs,
            ClientError::UnacceptableStatus {
                status: 503,
                body: Vec::new(),
            }
        );
        assert_ne!(lhs, ClientError::InvalidResponse);
        assert_eq!(lhs.status(), Some(503));
    }

    #[test]
    fn io_errors_map_onto_kinds() {
        let refused: TransportError = io::Error::from(io::ErrorKind::ConnectionRefused).into();
        assert_eq!(refused.kind(), TransportErrorKind::CannotConnectToHost);
        assert!(refused.is_transient());

        let reset: TransportError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert_eq!(reset.kind(), TransportErrorKind::NetworkConnectionLost);

        let denied: TransportError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert_eq!(denied.kind(), TransportErrorKind::Other);
        assert!(!denied.is_transient());
    }

    #[test]
    fn display_includes_kind_and_source() {
        let err = TransportError::with_source(
            TransportErrorKind::CannotFindHost,
            "no such host: books.invalid",
        );
        assert_eq!(
            err.to_string(),
            "cannot find host: no such host: books.invalid"
        );
        assert!(err.source().is_some());

        let wrapped = ClientError::from(err);
        assert_eq!(
            wrapped.to_string(),
            "transport error: cannot find host: no such host: books.invalid"
        );
        assert!(wrapped.source().is_some());
    }

    #[test]
    fn permanent_kinds_are_not_transient() {
        for kind in [
            TransportErrorKind::BadUrl,
            TransportErrorKind::TooManyRedirects,
            TransportErrorKind::Other,
        ] {
            assert!(!kind.is_transient(), "{kind:?}");
        }
    }
}
