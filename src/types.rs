use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use serde::{de::DeserializeOwned, Serialize};

/// HTTP methods the client can issue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            other => Err(format!("unsupported http method '{other}'")),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

/// How intermediate caches should treat a request.
///
/// Translated into `cache-control`/`pragma` headers when the request is
/// prepared. Headers set explicitly on the [`Request`] win.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CacheDirective {
    #[default]
    UseProtocolDefault,
    ReloadIgnoringCache,
    ReturnCacheElseLoad,
    ReturnCacheDontLoad,
}

impl CacheDirective {
    pub(crate) fn headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::UseProtocolDefault => &[],
            Self::ReloadIgnoringCache => &[("cache-control", "no-cache"), ("pragma", "no-cache")],
            Self::ReturnCacheElseLoad => &[("cache-control", "max-stale")],
            Self::ReturnCacheDontLoad => &[("cache-control", "only-if-cached")],
        }
    }
}

/// A logical request handed to [`ResilientClient::send`](crate::ResilientClient::send).
///
/// Header names are stored lower-cased, so a later `header("Accept", ..)`
/// replaces an earlier `header("accept", ..)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub cache: CacheDirective,
    /// Overrides the configured default timeout on every attempt.
    pub timeout: Option<Duration>,
    /// Overrides the configured retry budget for this call.
    pub max_retries: Option<u32>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
            cache: CacheDirective::default(),
            timeout: None,
            max_retries: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().trim().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets `content-type`.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("content-type", "application/json").body(body))
    }

    pub fn cache(mut self, cache: CacheDirective) -> Self {
        self.cache = cache;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Derives the protocol-level request for a single attempt.
    pub(crate) fn prepare(&self, default_timeout: Duration) -> PreparedRequest {
        let mut headers = BTreeMap::new();
        for (name, value) in self.cache.headers() {
            headers.insert((*name).to_owned(), (*value).to_owned());
        }
        // `headers` is public, so names inserted directly may not be lower-cased yet.
        headers.extend(self.headers.iter().map(|(name, value)| {
            (name.trim().to_ascii_lowercase(), value.clone())
        }));

        PreparedRequest {
            url: self.url.clone(),
            method: self.method,
            headers,
            body: self.body.clone(),
            timeout: self.timeout.unwrap_or(default_timeout),
        }
    }
}

/// The concrete request issued for one attempt, as seen by the
/// [`Transport`](crate::Transport) and the [`AttemptLogger`](crate::AttemptLogger).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedRequest {
    pub url: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// What a [`Transport`](crate::Transport) hands back for one exchange,
/// before the client has validated it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Validates the raw exchange. Returns `None` when it cannot be read as
    /// an HTTP response: an impossible status or an empty header name.
    ///
    /// Header values may carry obs-text (e.g. Latin-1 filenames); bytes
    /// that are not UTF-8 are replaced rather than rejected.
    pub(crate) fn interpret(self) -> Option<Response> {
        if !(100..=599).contains(&self.status) {
            return None;
        }

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in self.headers {
            let value = String::from_utf8_lossy(&value).into_owned();
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            headers
                .entry(name)
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        Some(Response {
            status: self.status,
            headers,
            body: self.body,
        })
    }
}

/// A successful response. Owned by the caller once returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Lower-cased header names; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
