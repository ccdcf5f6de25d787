//! Publishable event categories
//!
//! Any `Serialize` type can be published; these cover the broker's two
//! standard categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard event metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Event ID
    pub eid: String,

    /// Set by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    pub occurred_at: DateTime<Utc>,

    /// Set by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_eids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

impl Metadata {
    pub fn new(eid: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            eid: eid.into(),
            occurred_at,
            ..Self::default()
        }
    }
}

/// Kind of change described by a data change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOperation {
    #[serde(rename = "C")]
    Create,
    #[serde(rename = "U")]
    Update,
    #[serde(rename = "D")]
    Delete,
    #[serde(rename = "S")]
    Snapshot,
}

/// Event describing a change to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChangeEvent<T = Value> {
    pub metadata: Metadata,
    pub data_op: DataOperation,
    pub data_type: String,
    pub data: T,
}

/// Event describing a business process step; the payload sits next to `metadata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessEvent {
    pub metadata: Metadata,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}
