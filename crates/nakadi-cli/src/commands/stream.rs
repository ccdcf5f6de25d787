//! Stream command - consume a subscription until interrupted

use anyhow::{Context, Result};
use nakadi_client::{Client, StreamError, StreamOptions, Subscription};
use tracing::debug;

use crate::output::{format_batch, OutputContext};

/// Print batches from a subscription stream until Ctrl+C or the broker ends it
pub async fn stream(
    client: &Client,
    subscription_id: &str,
    options: StreamOptions,
    ctx: &OutputContext,
) -> Result<()> {
    let subscription = Subscription {
        id: subscription_id.to_string(),
        ..Default::default()
    };

    let mut stream = client
        .stream_with(&subscription, &options)
        .await
        .context("Failed to open event stream")?;

    ctx.info(&format!(
        "Streaming subscription {} (stream {})",
        stream.subscription_id(),
        stream.stream_id().unwrap_or("-")
    ));
    ctx.info("Press Ctrl+C to stop");

    let handle = stream.close_handle();
    ctrlc::set_handler(move || handle.close()).context("Failed to install Ctrl+C handler")?;

    let mut batches = 0usize;
    let mut events = 0usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(batch) => {
                batches += 1;
                events += batch.events.len();
                println!("{}", format_batch(&batch, ctx.format));
            }
            Err(StreamError::Closed) => {
                ctx.info("Stream closed by broker");
                break;
            }
            Err(e) => {
                ctx.error(&format!("Stream error: {}", e));
                return Err(e.into());
            }
        }
    }

    debug!(batches, events, "Stream finished");
    ctx.info(&format!("Received {} batch(es), {} event(s)", batches, events));
    Ok(())
}
