//! Nakadi Client Library
//!
//! Provides a typed HTTP client for the Nakadi event broker: create
//! subscriptions, publish events and consume subscription event streams.
//!
//! # Example
//!
//! ```rust,no_run
//! use nakadi_client::{BoxError, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .url("https://nakadi.example.com")
//!         .tokens(|| Ok::<_, BoxError>(std::env::var("NAKADI_TOKEN")?))
//!         .build()?;
//!
//!     // Create (or look up) a subscription
//!     let subscription = client.subscribe("my-app", "order.created", "").await?;
//!
//!     // Consume its event stream
//!     let mut stream = client.stream(&subscription).await?;
//!     while let Some(batch) = stream.next().await {
//!         let batch = batch?;
//!         println!("{} events", batch.events.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Every request, streams included, asks the configured [`TokenProvider`]
//! for a fresh token and sends it as `Authorization: Bearer <token>`. Without
//! a provider requests are sent anonymously.
//!
//! # Testing
//!
//! The `testing` module provides fake transports and a loopback server:
//!
//! ```rust,ignore
//! use nakadi_client::testing::{MockResponse, MockTransport};
//!
//! let transport = MockTransport::with_response(MockResponse::json(400, &problem));
//! let client = Client::builder().transport(transport).build()?;
//! ```

mod auth;
mod client;
mod config;
mod error;
pub mod event;
mod problem;
pub mod streaming;
pub mod testing;
mod transport;
mod types;

pub use auth::{authorize, TokenProvider};
pub use client::Client;
pub use config::{ClientBuilder, ClientConfig, DEFAULT_NAKADI_URL, DEFAULT_TIMEOUT};
pub use error::{BoxError, NakadiError, Result};
pub use problem::Problem;
pub use transport::{ReqwestTransport, Transport};
pub use types::*;

// Re-export streaming types for convenience
pub use streaming::{CloseHandle, Cursor, EventBatch, EventStream, StreamError, StreamOptions};
