//! Types for event streams

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BoxError;

/// Position within a partition of a subscription stream
///
/// All fields are opaque to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default)]
    pub partition: String,

    #[serde(default)]
    pub offset: String,

    #[serde(default)]
    pub event_type: String,

    /// Identifies the cursor when committing it
    #[serde(default)]
    pub cursor_token: String,
}

/// One frame of a subscription stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub cursor: Cursor,

    /// Raw events; absent in heartbeat frames
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<serde_json::Value>,

    /// Optional debugging information attached by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

impl EventBatch {
    /// True for keep-alive frames carrying no events
    pub fn is_heartbeat(&self) -> bool {
        self.events.is_empty()
    }

    /// Decode all events as `T`
    pub fn decode_events<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.events
            .iter()
            .map(|event| T::deserialize(event))
            .collect()
    }
}

/// Tuning parameters sent with the stream request
///
/// Unset fields are left to the broker's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Maximum events per batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_limit: Option<u32>,

    /// Events after which the broker ends the stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_limit: Option<u32>,

    /// Seconds the broker waits to fill a batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_flush_timeout: Option<u32>,

    /// Seconds after which the broker ends the stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_timeout: Option<u32>,

    /// Uncommitted events the broker sends before pausing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_uncommitted_events: Option<u32>,

    /// Client-side cap on a single frame, in bytes; never sent to the broker
    #[serde(skip)]
    pub max_frame_size: Option<usize>,
}

impl StreamOptions {
    /// Query string pairs for the set fields
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("batch_limit", self.batch_limit),
            ("stream_limit", self.stream_limit),
            ("batch_flush_timeout", self.batch_flush_timeout),
            ("stream_timeout", self.stream_timeout),
            ("max_uncommitted_events", self.max_uncommitted_events),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v.to_string())))
        .collect()
    }
}

/// Terminal failures of an open stream
///
/// After yielding one of these the stream is finished.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A frame was not valid JSON; framing can no longer be trusted
    #[error("failed to decode stream frame: {source} (frame: {line})")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The connection failed while reading the body
    #[error("stream connection error: {0}")]
    Connection(#[source] BoxError),

    /// A frame grew past the configured limit without a newline
    #[error("stream frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    /// The broker ended the body
    #[error("stream closed by broker")]
    Closed,
}

impl StreamError {
    /// True if reopening the stream is a sensible reaction
    pub fn is_reconnectable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Closed)
    }
}

/// Result type for stream items
pub type StreamResult<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        order_number: String,
    }

    #[test]
    fn test_decode_events() {
        let batch = EventBatch {
            cursor: Cursor::default(),
            events: vec![json!({"order_number": "1"}), json!({"order_number": "2"})],
            info: None,
        };

        let orders: Vec<Order> = batch.decode_events().unwrap();
        assert_eq!(orders[1].order_number, "2");
    }

    #[test]
    fn test_query_pairs_only_contain_set_options() {
        let options = StreamOptions {
            batch_limit: Some(10),
            stream_timeout: Some(60),
            ..Default::default()
        };

        assert_eq!(
            options.query_pairs(),
            vec![
                ("batch_limit", "10".to_string()),
                ("stream_timeout", "60".to_string())
            ]
        );
    }

    #[test]
    fn test_reconnectable_errors() {
        assert!(StreamError::Closed.is_reconnectable());

        let source = serde_json::from_str::<EventBatch>("{").unwrap_err();
        let decode = StreamError::Decode {
            line: "{".into(),
            source,
        };
        assert!(!decode.is_reconnectable());

        let oversized = StreamError::FrameTooLarge { size: 10, limit: 5 };
        assert!(!oversized.is_reconnectable());
    }

    #[test]
    fn test_max_frame_size_is_not_a_query_parameter() {
        let options = StreamOptions {
            max_frame_size: Some(1024),
            ..Default::default()
        };

        assert!(options.query_pairs().is_empty());
    }
}
