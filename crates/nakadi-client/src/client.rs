//! Nakadi HTTP client implementation

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Body, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::auth::{authorize, TokenProvider};
use crate::config::ClientBuilder;
use crate::error::{NakadiError, Result};
use crate::problem::{decode_problem, decode_problem_body};
use crate::streaming::{EventStream, StreamOptions, DEFAULT_MAX_FRAME_SIZE};
use crate::transport::Transport;
use crate::types::{BatchItemResponse, Subscription, SubscriptionRequest};

/// Media type of stream bodies
const STREAM_CONTENT_TYPE: &str = "application/x-json-stream";

/// Nakadi REST API client
///
/// Holds the broker URL, two transports (a bounded one for subscribe and
/// publish, an unbounded one for streams) and an optional token provider.
/// Cloning is cheap and all operations take `&self`, so one client can be
/// shared between tasks.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    stream_transport: Arc<dyn Transport>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl Client {
    /// Create a client with default settings and no authentication
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// Start configuring a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        base_url: Url,
        timeout: Duration,
        transport: Arc<dyn Transport>,
        stream_transport: Arc<dyn Transport>,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        Self {
            base_url,
            timeout,
            transport,
            stream_transport,
            token_provider,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the control-plane timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transport used for subscribe and publish
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Transport used for event streams
    pub fn stream_transport(&self) -> &Arc<dyn Transport> {
        &self.stream_transport
    }

    /// The configured token provider, if any
    pub fn token_provider(&self) -> Option<&Arc<dyn TokenProvider>> {
        self.token_provider.as_ref()
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Create a subscription for a single event type
    ///
    /// The broker returns the existing subscription if one with the same
    /// owning application, event types and consumer group exists. An empty
    /// `consumer_group` leaves the choice to the broker.
    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        owning_application: &str,
        event_type: &str,
        consumer_group: &str,
    ) -> Result<Subscription> {
        let request = SubscriptionRequest::new(owning_application, event_type, consumer_group);
        self.subscribe_with(&request).await
    }

    /// Create a subscription from a full request
    #[instrument(skip(self, request), fields(app = %request.owning_application))]
    pub async fn subscribe_with(&self, request: &SubscriptionRequest) -> Result<Subscription> {
        let url = self.endpoint(&["subscriptions"])?;
        debug!("Creating subscription at {}", url);

        let request = self.json_request(Method::POST, url, request)?;
        let response = self.send(request).await?;

        if response.status().is_success() {
            decode_json(response).await
        } else {
            Err(decode_problem(response).await)
        }
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Publish events to an event type
    ///
    /// A 207 response becomes [`NakadiError::PartialPublish`]: some events
    /// were accepted, so resending the whole batch may duplicate them. A 422
    /// response with per-event results becomes
    /// [`NakadiError::PublishRejected`]: nothing was published.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn publish<E: Serialize>(&self, event_type: &str, events: &[E]) -> Result<()> {
        if events.is_empty() {
            debug!("Nothing to publish");
            return Ok(());
        }

        let url = self.endpoint(&["event-types", event_type, "events"])?;
        let request = self.json_request(Method::POST, url, events)?;
        let response = self.send(request).await?;

        match response.status() {
            StatusCode::MULTI_STATUS => {
                let items: Vec<BatchItemResponse> = decode_json(response).await?;
                Err(NakadiError::PartialPublish(items))
            }
            status if status.is_success() => Ok(()),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| NakadiError::Connection(e.into()))?;
                match serde_json::from_slice::<Vec<BatchItemResponse>>(&body) {
                    Ok(items) => Err(NakadiError::PublishRejected(items)),
                    Err(_) => Err(decode_problem_body(
                        StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                        &body,
                    )),
                }
            }
            _ => Err(decode_problem(response).await),
        }
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Open the event stream of a subscription
    ///
    /// Returns once the broker accepted the request. Errors returned here mean
    /// the stream never opened; failures after that are yielded by the
    /// [`EventStream`] itself.
    pub async fn stream(&self, subscription: &Subscription) -> Result<EventStream> {
        self.stream_with(subscription, &StreamOptions::default())
            .await
    }

    /// Open the event stream of a subscription with tuning options
    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    pub async fn stream_with(
        &self,
        subscription: &Subscription,
        options: &StreamOptions,
    ) -> Result<EventStream> {
        if subscription.id.is_empty() {
            return Err(NakadiError::MissingSubscriptionId);
        }

        let mut url = self.endpoint(&["subscriptions", &subscription.id, "events"])?;
        let query = options.query_pairs();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        debug!("Connecting to event stream: {}", url);

        let mut request = Request::new(Method::GET, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(STREAM_CONTENT_TYPE));
        self.authenticate(&mut request)?;

        let response = self
            .stream_transport
            .execute(request)
            .await
            .map_err(NakadiError::Connection)?;

        if !response.status().is_success() {
            // The streaming transport has no total timeout; bound the error body read
            let error = tokio::time::timeout(self.timeout, decode_problem(response))
                .await
                .unwrap_or_else(|_| {
                    NakadiError::Connection("timed out reading stream error response".into())
                });
            return Err(error);
        }

        let max_frame_size = options.max_frame_size.unwrap_or(DEFAULT_MAX_FRAME_SIZE);
        Ok(EventStream::from_response(
            subscription.id.clone(),
            response,
            max_frame_size,
        ))
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Base URL with `segments` appended as percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                NakadiError::Config(format!("broker URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Authenticated request with a JSON body
    fn json_request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &T,
    ) -> Result<Request> {
        let body = serde_json::to_vec(body).map_err(|e| NakadiError::Encode(e.to_string()))?;

        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(Body::from(body));
        self.authenticate(&mut request)?;

        Ok(request)
    }

    /// Add the bearer token; without a token provider the request stays anonymous
    fn authenticate(&self, request: &mut Request) -> Result<()> {
        match &self.token_provider {
            Some(provider) => authorize(Some(provider.as_ref()), request),
            None => Ok(()),
        }
    }

    /// Send a control-plane request
    async fn send(&self, request: Request) -> Result<Response> {
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(NakadiError::Connection)?;
        debug!("Broker responded {}", response.status());
        Ok(response)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("transport", &self.transport)
            .field("stream_transport", &self.stream_transport)
            .field("authenticated", &self.token_provider.is_some())
            .finish()
    }
}

/// Deserialize a successful JSON response
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| NakadiError::Connection(e.into()))?;
    serde_json::from_slice(&body).map_err(|e| NakadiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_NAKADI_URL, DEFAULT_TIMEOUT};
    use crate::error::BoxError;

    #[test]
    fn test_no_options() {
        let client = Client::new().unwrap();

        assert_eq!(client.base_url(), &Url::parse(DEFAULT_NAKADI_URL).unwrap());
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(client.transport().timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(client.stream_transport().timeout(), None);
        assert!(client.token_provider().is_none());
    }

    #[test]
    fn test_timeout_option() {
        let timeout = Duration::from_secs(5);
        let client = Client::builder().timeout(timeout).build().unwrap();

        assert_eq!(client.base_url(), &Url::parse(DEFAULT_NAKADI_URL).unwrap());
        assert_eq!(client.timeout(), timeout);
        assert_eq!(client.transport().timeout(), Some(timeout));
        assert_eq!(client.stream_transport().timeout(), None);
        assert!(client.token_provider().is_none());
    }

    #[test]
    fn test_tokens_option() {
        let client = Client::builder()
            .tokens(|| Ok::<_, BoxError>("token".to_string()))
            .build()
            .unwrap();

        assert_eq!(client.base_url(), &Url::parse(DEFAULT_NAKADI_URL).unwrap());
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(client.transport().timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(client.stream_transport().timeout(), None);
        assert!(client.token_provider().is_some());
    }

    #[test]
    fn test_url_option() {
        let client = Client::builder()
            .url("https://example.com/nakadi")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "https://example.com/nakadi");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(client.transport().timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(client.stream_transport().timeout(), None);
        assert!(client.token_provider().is_none());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = Client::builder()
            .url("https://example.com/nakadi")
            .build()
            .unwrap();

        let url = client.endpoint(&["subscriptions", "abc", "events"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/nakadi/subscriptions/abc/events");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = Client::new().unwrap();

        let url = client
            .endpoint(&["event-types", "order created", "events"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/event-types/order%20created/events"
        );
    }
}
