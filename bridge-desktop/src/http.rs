//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{
        ByteStream, HttpClient, HttpClientOptions, HttpMethod, HttpRequest, HttpResponse,
        StreamingResponse,
    },
};
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Reqwest-based HTTP client implementation
///
/// Performs the transport only:
/// - Range requests for partial content
/// - Per-session default headers and user agent
/// - Streaming bodies
///
/// Failures are mapped onto [`BridgeError::Network`] and
/// [`BridgeError::Timeout`]; non-2xx statuses are returned to the caller as
/// regular responses.
pub struct ReqwestHttpClient {
    client: Client,
    default_headers: HashMap<String, String>,
    user_agent: Option<String>,
    read_timeout: Duration,
}

impl ReqwestHttpClient {
    /// Create a client with its own connection pool for one session.
    pub fn from_options(options: &HttpClientOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .read_timeout(options.read_timeout)
            .redirect(redirect_policy(options.allow_cross_protocol_redirects))
            .default_headers(header_map(&options.default_headers)?);
        if let Some(user_agent) = &options.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder
            .build()
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            default_headers: HashMap::new(),
            user_agent: None,
            read_timeout: options.read_timeout,
        })
    }

    /// Wrap a shared client. Session headers are applied per request so the
    /// underlying connection pool can be shared.
    pub fn shared(client: Client, options: &HttpClientOptions) -> Self {
        Self {
            client,
            default_headers: options.default_headers.clone(),
            user_agent: options.user_agent.clone(),
            read_timeout: options.read_timeout,
        }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in &self.default_headers {
            if !request.headers.contains_key(key) {
                req = req.header(key.as_str(), value.as_str());
            }
        }
        if let Some(user_agent) = &self.user_agent {
            req = req.header(USER_AGENT, user_agent.as_str());
        }
        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(range) = request.range {
            req = req.header(RANGE, range.header_value());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    async fn send(&self, request: HttpRequest) -> Result<reqwest::Response> {
        let url = request.url.clone();
        let timeout = request.timeout.unwrap_or(self.read_timeout);
        debug!(url = %url, range = ?request.range, "Executing HTTP request");

        self.build_request(request).send().await.map_err(|e| {
            warn!(error = %e, url = %url, "HTTP request failed");
            map_error(e, timeout)
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let timeout = request.timeout.unwrap_or(self.read_timeout);
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let headers = response_headers(response.headers());

        let body = response.bytes().await.map_err(|e| map_error(e, timeout))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn open_stream(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let timeout = request.timeout.unwrap_or(self.read_timeout);
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let headers = response_headers(response.headers());
        let content_length = response.content_length();

        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map_err(move |e| map_error(e, timeout)),
        );

        Ok(StreamingResponse {
            status,
            headers,
            content_length,
            body,
        })
    }
}

/// Follows up to [`MAX_REDIRECTS`] hops; scheme changes only when allowed.
pub(crate) fn redirect_policy(allow_cross_protocol: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let allowed = match attempt.previous().last() {
            Some(from) => redirect_allowed(from, attempt.url(), allow_cross_protocol),
            None => true,
        };
        if allowed {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

fn redirect_allowed(from: &Url, to: &Url, allow_cross_protocol: bool) -> bool {
    allow_cross_protocol || from.scheme() == to.scheme()
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| BridgeError::OperationFailed(format!("Invalid header name: {}", key)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| BridgeError::OperationFailed(format!("Invalid value for header {}", key)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn response_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
        .collect()
}

fn map_error(e: reqwest::Error, timeout: Duration) -> BridgeError {
    if e.is_timeout() {
        BridgeError::Timeout(timeout.as_millis() as u64)
    } else if e.is_connect() {
        BridgeError::Network(format!("Connection failed: {}", e))
    } else if e.is_builder() {
        BridgeError::OperationFailed(e.to_string())
    } else {
        BridgeError::Network(e.to_string())
    }
}
