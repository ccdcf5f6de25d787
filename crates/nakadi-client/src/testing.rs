//! Test utilities for nakadi-client
//!
//! Two ways to test code that talks to the broker:
//!
//! - [`MockTransport`] / [`FailingTransport`] replace the network entirely.
//!   Responses are queued up front, outgoing requests are recorded.
//! - [`TestServer`] serves an axum router on a loopback port and hands out a
//!   [`Client`] pointed at it.
//!
//! ```ignore
//! use nakadi_client::testing::{MockResponse, MockTransport};
//!
//! let transport = MockTransport::new();
//! transport.push(MockResponse::json(200, &subscription));
//! let client = Client::builder().transport(transport.clone()).build()?;
//! ```

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use crate::error::BoxError;
use crate::transport::Transport;
use crate::{Client, Result};

type ChunkResult = std::result::Result<Bytes, io::Error>;

// =============================================================================
// Fake transports
// =============================================================================

/// A request as seen by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

#[derive(Debug)]
enum MockBody {
    Full(Bytes),
    Chunked(mpsc::Receiver<ChunkResult>),
}

/// A canned response for [`MockTransport`]
#[derive(Debug)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: MockBody,
}

impl MockResponse {
    /// Response with a JSON body
    pub fn json<T: Serialize + ?Sized>(status: u16, body: &T) -> Self {
        let body = serde_json::to_vec(body).unwrap_or_default();
        Self::bytes(status, body).with_header("content-type", "application/json")
    }

    /// Response with a raw body
    pub fn bytes(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: MockBody::Full(body.into()),
        }
    }

    /// Response whose body is fed chunk by chunk through the returned
    /// [`ChunkedBody`]
    pub fn chunked(status: u16) -> (Self, ChunkedBody) {
        let (tx, rx) = mpsc::channel(16);
        let response = Self {
            status,
            headers: Vec::new(),
            body: MockBody::Chunked(rx),
        };
        (response, ChunkedBody { tx })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn into_response(self) -> std::result::Result<Response, BoxError> {
        let mut builder = http::Response::builder().status(StatusCode::from_u16(self.status)?);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = match self.body {
            MockBody::Full(bytes) => reqwest::Body::from(bytes),
            MockBody::Chunked(rx) => reqwest::Body::wrap_stream(ReceiverStream::new(rx)),
        };

        Ok(Response::from(builder.body(body)?))
    }
}

/// Sending side of a chunked [`MockResponse`] body
///
/// Dropping it (or calling [`finish`](Self::finish)) ends the body.
#[derive(Debug)]
pub struct ChunkedBody {
    tx: mpsc::Sender<ChunkResult>,
}

impl ChunkedBody {
    /// Send raw bytes; returns false once the reader is gone
    pub async fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(chunk.into())).await.is_ok()
    }

    /// Send one JSON value followed by a newline
    pub async fn send_line<T: Serialize>(&self, value: &T) -> bool {
        let mut line = serde_json::to_vec(value).unwrap_or_default();
        line.push(b'\n');
        self.send(line).await
    }

    /// Fail the body as if the connection was reset
    pub async fn fail(&self, message: &str) -> bool {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, message.to_string());
        self.tx.send(Err(err)).await.is_ok()
    }

    /// Wait until the reader has released the body
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// End the body
    pub fn finish(self) {}
}

/// In-process [`Transport`] returning queued responses in order
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transport answering the first request with `response`
    pub fn with_response(response: MockResponse) -> Arc<Self> {
        let transport = Self::new();
        transport.push(response);
        transport
    }

    /// Queue a response
    pub fn push(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// All requests executed so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request) -> std::result::Result<Response, BoxError> {
        self.requests.lock().push(RecordedRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|body| body.as_bytes())
                .map(<[u8]>::to_vec),
        });

        let response = self
            .responses
            .lock()
            .pop_front()
            .ok_or_else(|| format!("no mock response for {} {}", request.method(), request.url()))?;
        response.into_response()
    }
}

/// [`Transport`] that fails every request before a response arrives
#[derive(Debug, Default)]
pub struct FailingTransport {
    calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of requests attempted
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn execute(&self, request: Request) -> std::result::Result<Response, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Box::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("connection refused: {}", request.url()),
        )))
    }
}

// =============================================================================
// Loopback server
// =============================================================================

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum router playing the broker
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::post, Json, Router};
    /// use nakadi_client::testing::TestServer;
    ///
    /// let router = Router::new().route("/subscriptions", post(create_subscription));
    /// let server = TestServer::start(router).await?;
    ///
    /// let sub = server.client.subscribe("app", "order.created", "").await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with(router, |builder| builder).await
    }

    /// Serve a router and customize the client, e.g. to add a token provider
    pub async fn start_with<F>(router: axum::Router, configure: F) -> Result<Self>
    where
        F: FnOnce(crate::ClientBuilder) -> crate::ClientBuilder,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| crate::NakadiError::Connection(e.into()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| crate::NakadiError::Connection(e.into()))?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let builder = Client::builder()
            .url(format!("http://{}", addr))
            .timeout(Duration::from_secs(5));
        let client = configure(builder).build()?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
