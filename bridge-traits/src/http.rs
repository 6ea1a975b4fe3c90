//! HTTP Client Abstraction
//!
//! Provides async HTTP operations for stream playback and media downloads.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Convenience constructor for the common GET case.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach a pre-built header map (e.g., stream authorization headers).
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn basic_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Basic {}", token.into()))
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| {
            crate::error::BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e))
        })
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Content length advertised by the server, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .or_else(|| self.headers.get("Content-Length"))
            .and_then(|v| v.parse().ok())
    }
}

/// A streaming download: advertised length plus an async byte reader.
pub struct ByteStream {
    /// Total size in bytes, when the server reports one.
    pub content_length: Option<u64>,
    /// Async reader over the response body.
    pub reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
}

/// Async HTTP client trait
///
/// Platform implementations should handle connection pooling, TLS, and
/// timeouts. Authorization is supplied per-request through headers; the
/// client itself holds no credentials.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn probe(client: &dyn HttpClient, url: &str) -> Result<bool> {
///     let response = client.execute(HttpRequest::get(url)).await?;
///     Ok(response.is_success())
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request, buffering the full response body.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Open a streaming download for a (typically large) media resource.
    ///
    /// The returned reader yields the response body incrementally so the
    /// caller can write to disk without holding the file in memory.
    async fn download_stream(&self, request: HttpRequest) -> Result<ByteStream>;
}
