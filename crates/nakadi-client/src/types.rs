//! Request and response types for the Nakadi REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Subscriptions
// =============================================================================

/// Where a new subscription starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFrom {
    /// Oldest available event
    Begin,
    /// Only events published after creation
    End,
    /// Explicit initial cursors
    Cursors,
}

/// A durable consumption group over one or more event types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Assigned by the broker; empty until created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Application owning the subscription
    pub owning_application: String,

    /// Subscribed event types
    #[serde(default)]
    pub event_types: Vec<String>,

    /// Consumer group
    #[serde(default)]
    pub consumer_group: String,

    /// Start position policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_from: Option<ReadFrom>,

    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /subscriptions`
///
/// The broker treats the request as an upsert keyed by owning application,
/// event types and consumer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub owning_application: String,

    pub event_types: Vec<String>,

    /// Omitted when empty so the broker applies its default group
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub consumer_group: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_from: Option<ReadFrom>,
}

impl SubscriptionRequest {
    /// Request for a single event type
    pub fn new(
        owning_application: impl Into<String>,
        event_type: impl Into<String>,
        consumer_group: impl Into<String>,
    ) -> Self {
        Self {
            owning_application: owning_application.into(),
            event_types: vec![event_type.into()],
            consumer_group: consumer_group.into(),
            read_from: None,
        }
    }

    /// Add another event type
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    /// Set the start position policy
    pub fn with_read_from(mut self, read_from: ReadFrom) -> Self {
        self.read_from = Some(read_from);
        self
    }
}

// =============================================================================
// Publishing
// =============================================================================

/// Outcome of a single event in a publish batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishingStatus {
    Submitted,
    Failed,
    Aborted,
}

/// Stage at which publishing of an event stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishingStep {
    None,
    Validating,
    Partitioning,
    Enriching,
    Publishing,
}

/// Per-event entry of a 207/422 publish response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResponse {
    /// Event ID, when the event carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eid: Option<String>,

    pub publishing_status: PublishingStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<PublishingStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
