//! Outbound requests to media origins.

use std::error::Error as _;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("{}", describe(.0))]
    Request(#[from] reqwest::Error),
}

/// `reqwest` keeps the interesting part (DNS failure, refused connection,
/// TLS error) in the source chain, so flatten it into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn map_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(err)
    }
}

/// Performs exactly one GET per call with a fixed browser-like identity.
/// Never retries.
#[derive(Clone)]
pub struct OriginFetcher {
    client: reqwest::Client,
    user_agent: String,
    timeout: Option<Duration>,
}

/// Status, headers and the not-yet-consumed body of an origin response.
pub struct OriginResponse {
    inner: reqwest::Response,
    timeout: Option<Duration>,
}

impl OriginFetcher {
    /// `timeout` bounds the request and any fully-buffered body read. `None`
    /// leaves it to the platform.
    pub fn new(user_agent: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn fetch(&self, target: &Url, range: Option<&str>) -> Result<OriginResponse, FetchError> {
        let mut request = self
            .client
            .get(target.as_str())
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::ACCEPT, "*/*")
            .header(header::REFERER, referer_for(target));
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        debug!("Origin fetch: url={} Range={:?}", target, range);
        let send = request.send();
        let inner = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| FetchError::Timeout)?,
            None => send.await,
        }
        .map_err(map_error)?;

        Ok(OriginResponse {
            inner,
            timeout: self.timeout,
        })
    }
}

/// Scheme, host and (non-default) port of the target, e.g. `https://cdn.example`.
pub fn referer_for(target: &Url) -> String {
    target.origin().ascii_serialization()
}

impl OriginResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE)
    }

    pub fn header_str(&self, name: header::HeaderName) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Read the entire body as text.
    pub async fn text(self) -> Result<String, FetchError> {
        let read = self.inner.text();
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(map_error),
            None => read.await.map_err(map_error),
        }
    }

    /// The body as a chunk stream. Chunks are only read from the origin as
    /// the consumer polls, so a slow downstream pauses the upstream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send {
        self.inner.bytes_stream()
    }
}
