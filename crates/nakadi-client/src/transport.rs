//! HTTP transports
//!
//! Requests are built as plain [`reqwest::Request`] values and handed to a
//! [`Transport`], so tests can swap the network for an in-process fake.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, Response};

use crate::error::{BoxError, Result};

/// TCP keep-alive interval for streaming connections
const STREAM_KEEPALIVE: Duration = Duration::from_secs(30);

/// Executes a single HTTP request.
///
/// An `Err` means no response was received (DNS failure, refused connection,
/// timeout). Any HTTP status, including errors, is an `Ok` response.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send the request and return the response head; the body is read lazily.
    async fn execute(&self, request: Request) -> std::result::Result<Response, BoxError>;

    /// Total per-request timeout, if any
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// [`Transport`] backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Transport for request/response calls: both connecting and the whole
    /// exchange are bounded by `timeout`.
    pub fn control(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            timeout: Some(timeout),
        })
    }

    /// Transport for long-lived streams: only connecting is bounded by
    /// `connect_timeout`, the response body may stay open indefinitely.
    pub fn streaming(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .tcp_keepalive(STREAM_KEEPALIVE)
            .build()?;

        Ok(Self {
            client,
            timeout: None,
        })
    }

    /// Wrap an existing client. `timeout` should reflect how it was built.
    pub fn from_client(client: Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> std::result::Result<Response, BoxError> {
        self.client.execute(request).await.map_err(Into::into)
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_transport_timeout() {
        let transport = ReqwestTransport::control(Duration::from_secs(5)).unwrap();
        assert_eq!(transport.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_streaming_transport_is_unbounded() {
        let transport = ReqwestTransport::streaming(Duration::from_secs(5)).unwrap();
        assert_eq!(transport.timeout(), None);
    }
}
