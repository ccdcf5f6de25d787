//! Event stream implementation

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::Response;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::parser::FrameParser;
use super::types::{EventBatch, StreamError, StreamResult};

/// Header carrying the broker-assigned stream ID
pub const STREAM_ID_HEADER: &str = "X-Nakadi-StreamId";

type BatchStream = Pin<Box<dyn Stream<Item = StreamResult<EventBatch>> + Send>>;

/// An open subscription stream
///
/// Implements `Stream<Item = Result<EventBatch, StreamError>>`. A reader task
/// owns the response body and decodes batches as the broker sends them; at
/// most one decoded batch waits for the consumer.
///
/// # Lifecycle
///
/// - Created via `Client::stream()` once the broker accepted the request
/// - Batches are pulled via `next()` or the `Stream` trait
/// - A terminal error (`Decode`, `Connection` or `Closed`) is yielded at most
///   once, after which the stream returns `None`
/// - `close()`, a [`CloseHandle`], or dropping the stream releases the
///   connection; no batch is yielded after that
///
/// # Example
///
/// ```ignore
/// let mut stream = client.stream(&subscription).await?;
///
/// while let Some(batch) = stream.next().await {
///     let batch = batch?;
///     println!("{} events at {}", batch.events.len(), batch.cursor.offset);
/// }
/// ```
pub struct EventStream {
    subscription_id: String,

    /// Broker-assigned stream ID, needed to commit cursors
    stream_id: Option<String>,

    cancel: CancellationToken,

    /// `None` once the stream has finished or was closed
    inner: Option<BatchStream>,
}

/// Closes an [`EventStream`] from another task or a signal handler
#[derive(Debug, Clone)]
pub struct CloseHandle {
    cancel: CancellationToken,
}

impl CloseHandle {
    /// Close the stream and drop the connection
    ///
    /// The reader task releases the body even when nobody is polling the
    /// stream; a pending `next()` returns `None`.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl EventStream {
    /// Wrap an accepted (2xx) stream response
    ///
    /// Must be called within a tokio runtime.
    pub(crate) fn from_response(
        subscription_id: String,
        response: Response,
        max_frame_size: usize,
    ) -> Self {
        let stream_id = response
            .headers()
            .get(STREAM_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        debug!(
            subscription_id = %subscription_id,
            stream_id = stream_id.as_deref().unwrap_or("-"),
            "Stream opened"
        );

        let cancel = CancellationToken::new();
        let rx = spawn_reader(response.bytes_stream(), cancel.clone(), max_frame_size);
        let inner: BatchStream = Box::pin(ReceiverStream::new(rx));

        Self {
            subscription_id,
            stream_id,
            cancel,
            inner: Some(inner),
        }
    }

    /// Get the subscription ID
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Get the stream ID assigned by the broker, if it sent one
    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    /// Get the next batch from the stream
    ///
    /// Waits until the broker sends a frame. Returns `None` when the stream
    /// has finished or was closed.
    pub async fn next(&mut self) -> Option<StreamResult<EventBatch>> {
        <Self as StreamExt>::next(self).await
    }

    /// Handle that can close this stream while it is being polled elsewhere
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Close the stream and drop the connection
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.inner = None;
    }

    /// True once the stream can yield nothing more
    pub fn is_closed(&self) -> bool {
        self.inner.is_none() || self.cancel.is_cancelled()
    }
}

impl Stream for EventStream {
    type Item = StreamResult<EventBatch>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.cancel.is_cancelled() {
            this.inner = None;
            return Poll::Ready(None);
        }

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscription_id", &self.subscription_id)
            .field("stream_id", &self.stream_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        // Outstanding close handles report the stream as closed
        self.cancel.cancel();
    }
}

/// Move the body into a task that hands decoded batches to the consumer.
///
/// The task, and with it the connection, ends on cancellation, on the first
/// terminal error, or when the receiver is dropped.
fn spawn_reader<S>(
    byte_stream: S,
    cancel: CancellationToken,
    max_frame_size: usize,
) -> mpsc::Receiver<StreamResult<EventBatch>>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let items = batches(byte_stream, cancel.clone(), max_frame_size);
        tokio::pin!(items);

        while let Some(item) = items.next().await {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(item) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Stream reader finished");
    });

    rx
}

/// Turn the raw body into batches, ending on the first terminal error or on
/// cancellation.
fn batches<S>(
    byte_stream: S,
    cancel: CancellationToken,
    max_frame_size: usize,
) -> impl Stream<Item = StreamResult<EventBatch>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut parser = FrameParser::with_max_frame_size(max_frame_size);

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Stream closed by consumer");
                    return;
                }
                chunk = byte_stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for item in parser.feed(bytes) {
                        let failed = item.is_err();
                        if let Err(e) = &item {
                            warn!("Abandoning stream: {}", e);
                        }
                        yield item;
                        if failed {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("Stream connection failed: {}", e);
                    yield Err(StreamError::Connection(e.into()));
                    return;
                }
                None => {
                    if let Some(item) = parser.finish() {
                        let failed = item.is_err();
                        yield item;
                        if failed {
                            return;
                        }
                    }
                    debug!("Stream ended by broker");
                    yield Err(StreamError::Closed);
                    return;
                }
            }
        }
    }
}
