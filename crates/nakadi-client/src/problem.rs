//! Broker problem payloads
//!
//! Nakadi reports failures as `application/problem+json` documents. This
//! module turns a non-2xx response into a [`NakadiError`].

use std::fmt;

use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NakadiError;

/// Maximum number of body bytes kept when the body is not a problem document
const MAX_BODY_SNIPPET: usize = 256;

/// Structured error payload returned by the broker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Problem type URI
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,

    /// Short summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status reported by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Human readable explanation
    pub detail: String,

    /// URI of the specific occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.title) {
            (Some(status), Some(title)) => write!(f, "{} {}: {}", status, title, self.detail),
            (Some(status), None) => write!(f, "{}: {}", status, self.detail),
            (None, Some(title)) => write!(f, "{}: {}", title, self.detail),
            (None, None) => f.write_str(&self.detail),
        }
    }
}

/// Decode a non-2xx response into an error.
///
/// The response status fills in a missing `status` field of the problem.
pub(crate) async fn decode_problem(response: Response) -> NakadiError {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return NakadiError::Connection(e.into()),
    };

    decode_problem_body(status, &body)
}

pub(crate) fn decode_problem_body(status: u16, body: &[u8]) -> NakadiError {
    match serde_json::from_slice::<Problem>(body) {
        Ok(mut problem) => {
            problem.status.get_or_insert(status);
            debug!("Broker problem: {}", problem);
            NakadiError::Problem(problem)
        }
        Err(_) => NakadiError::UnexpectedResponse {
            status,
            body: snippet(body),
        },
    }
}

/// Lossy UTF-8 prefix of `body`, cut on a char boundary
fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_BODY_SNIPPET {
        return text.into_owned();
    }

    let mut end = MAX_BODY_SNIPPET;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
