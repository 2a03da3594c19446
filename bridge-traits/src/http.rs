//! HTTP Engine Abstraction
//!
//! Media data is fetched through an [`HttpClient`] produced by an
//! [`HttpEngine`]. Two engines are usually available to a session: a
//! high-performance engine that is expensive to construct (and therefore
//! built by an [`EngineBuilder`] at most once per registry) and a standard
//! engine that is always present.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Default connect timeout for media requests.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3_000);
/// Default read timeout for media requests.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(15_000);

/// HTTP method types used by media fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

/// Half-open byte range `[start, end)`. An open end reads to EOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn from(start: u64) -> Self {
        Self { start, end: None }
    }

    pub fn bounded(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Value for the `Range` request header (inclusive end).
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) if end > self.start => format!("bytes={}-{}", self.start, end - 1),
            _ => format!("bytes={}-", self.start),
        }
    }
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub range: Option<ByteRange>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            range: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in headers {
            self.headers.insert(key.into(), value.into());
        }
        self
    }

    pub fn range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Buffered HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Chunked response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Response whose body is consumed incrementally.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Length of the body as announced by the server, if any.
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Per-session client settings derived from the request headers.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpClientOptions {
    pub user_agent: Option<String>,
    pub default_headers: HashMap<String, String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Follow redirects that switch between http and https.
    pub allow_cross_protocol_redirects: bool,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            default_headers: HashMap::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            allow_cross_protocol_redirects: true,
        }
    }
}

impl HttpClientOptions {
    /// Splits the `User-Agent` header (matched case-insensitively) out of
    /// `headers`; the remaining entries become default request headers.
    pub fn from_headers(headers: &HashMap<String, String>, fallback_user_agent: &str) -> Self {
        let mut options = Self::default();
        for (key, value) in headers {
            if key.eq_ignore_ascii_case("user-agent") {
                options.user_agent = Some(value.clone());
            } else {
                options.default_headers.insert(key.clone(), value.clone());
            }
        }
        if options.user_agent.is_none() && !fallback_user_agent.is_empty() {
            options.user_agent = Some(fallback_user_agent.to_string());
        }
        options
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }
}

/// Async HTTP client trait
///
/// Implementations perform the transport only. They must not retry on their
/// own: recovery is owned by the playback session.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{ByteRange, HttpClient, HttpRequest};
///
/// async fn head_bytes(client: &dyn HttpClient) -> Result<StreamingResponse> {
///     let request = HttpRequest::get("https://cdn.example.com/movie.mp4")
///         .range(ByteRange::bounded(0, 64 * 1024));
///     client.open_stream(request).await
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a request and buffer the full body.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute a request and hand back the body as a stream of chunks.
    async fn open_stream(&self, request: HttpRequest) -> Result<StreamingResponse>;
}

/// Which network engine produced a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    HighPerformance,
    Standard,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::HighPerformance => "high_performance",
            EngineKind::Standard => "standard",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network engine able to mint session-configured clients.
pub trait HttpEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    fn client(&self, options: &HttpClientOptions) -> Result<Arc<dyn HttpClient>>;

    /// Release native resources. Called once when the last holder lets go.
    fn shutdown(&self) {}
}

/// Constructs the high-performance engine.
///
/// `build` may perform blocking I/O (native library initialisation) and may
/// fail; callers fall back to the standard engine on error.
pub trait EngineBuilder: Send + Sync {
    fn build(&self) -> Result<Arc<dyn HttpEngine>>;
}
