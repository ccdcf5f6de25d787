//! Error types for Nakadi client operations

use thiserror::Error;

use crate::problem::Problem;
use crate::types::{BatchItemResponse, PublishingStatus};

/// Boxed error used for failures coming out of pluggable collaborators
/// (token providers, transports).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for Nakadi client operations
pub type Result<T> = std::result::Result<T, NakadiError>;

/// Errors that can occur during Nakadi client operations
#[derive(Error, Debug)]
pub enum NakadiError {
    /// Authentication was required but no token provider was configured
    #[error("no token func provided")]
    NoTokenProvider,

    /// The token provider failed
    #[error("failed to retrieve token: {0}")]
    Token(#[source] BoxError),

    /// The token could not be used as a header value
    #[error("token is not a valid header value")]
    InvalidToken,

    /// Transport failed before any response was received
    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),

    /// Broker returned a problem payload
    #[error("{0}")]
    Problem(Problem),

    /// Broker returned an error response that is not a problem payload
    #[error("unexpected response {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// A request body could not be serialized
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// A successful response could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Some events of a batch were not published
    #[error("partial publish: {} of {} events rejected", rejected_count(.0), .0.len())]
    PartialPublish(Vec<BatchItemResponse>),

    /// The whole batch was rejected before publishing
    #[error("publish rejected: {} events not published", .0.len())]
    PublishRejected(Vec<BatchItemResponse>),

    /// A stream was requested for a subscription that has no ID
    #[error("subscription has no ID")]
    MissingSubscriptionId,

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

fn rejected_count(items: &[BatchItemResponse]) -> usize {
    items
        .iter()
        .filter(|item| item.publishing_status != PublishingStatus::Submitted)
        .count()
}

impl NakadiError {
    /// True if the request never reached the broker or no response arrived
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// True if the broker answered with a problem payload
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Problem(_))
    }

    /// True if part of a published batch was accepted.
    ///
    /// Retrying the whole batch after this error may duplicate the accepted events.
    pub fn is_partial_publish(&self) -> bool {
        matches!(self, Self::PartialPublish(_))
    }

    /// The broker's problem payload, if any
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            Self::Problem(problem) => Some(problem),
            _ => None,
        }
    }

    /// Per-event results of a failed publish
    pub fn batch_items(&self) -> &[BatchItemResponse] {
        match self {
            Self::PartialPublish(items) | Self::PublishRejected(items) => items,
            _ => &[],
        }
    }

    /// Events of a failed publish that the broker accepted
    pub fn accepted(&self) -> impl Iterator<Item = &BatchItemResponse> {
        self.batch_items()
            .iter()
            .filter(|item| item.publishing_status == PublishingStatus::Submitted)
    }

    /// Events of a failed publish that the broker did not accept
    pub fn rejected(&self) -> impl Iterator<Item = &BatchItemResponse> {
        self.batch_items()
            .iter()
            .filter(|item| item.publishing_status != PublishingStatus::Submitted)
    }
}
