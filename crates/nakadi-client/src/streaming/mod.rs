//! Subscription event streams
//!
//! The broker answers `GET /subscriptions/{id}/events` with a chunked body of
//! newline-delimited JSON batches, each carrying a cursor and zero or more
//! events. Empty batches are heartbeats and are never surfaced.
//!
//! # Example
//!
//! ```no_run
//! use nakadi_client::{Client, Subscription};
//!
//! # async fn example(subscription: Subscription) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new()?;
//!
//! let mut stream = client.stream(&subscription).await?;
//!
//! // Consume batches
//! while let Some(batch) = stream.next().await {
//!     match batch {
//!         Ok(batch) => {
//!             println!("offset={}, events={}", batch.cursor.offset, batch.events.len());
//!         }
//!         Err(e) => {
//!             // Reopen with the same subscription to resume
//!             eprintln!("Stream error: {}", e);
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod parser;
mod reader;
mod types;

pub use parser::{FrameParser, DEFAULT_MAX_FRAME_SIZE};
pub use reader::{CloseHandle, EventStream, STREAM_ID_HEADER};
pub use types::{Cursor, EventBatch, StreamError, StreamOptions, StreamResult};
