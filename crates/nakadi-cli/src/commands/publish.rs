//! Publish command - send a batch of events to an event type

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nakadi_client::{Client, NakadiError};
use serde_json::Value;

use crate::output::{BatchItemRow, OutputContext};

/// Publish events read from `source` ("-" for stdin)
pub async fn publish(
    client: &Client,
    event_type: &str,
    source: &Path,
    ctx: &OutputContext,
) -> Result<()> {
    let content = read_source(source)?;
    let events = parse_events(&content)?;

    if events.is_empty() {
        ctx.warn("No events to publish");
        return Ok(());
    }

    match client.publish(event_type, &events).await {
        Ok(()) => {
            ctx.success(&format!("Published {} event(s) to {}", events.len(), event_type));
            Ok(())
        }
        Err(e @ (NakadiError::PartialPublish(_) | NakadiError::PublishRejected(_))) => {
            let rows: Vec<BatchItemRow> = e.batch_items().iter().map(BatchItemRow::from).collect();
            ctx.print(&rows);
            Err(e.into())
        }
        Err(e) => Err(e).context("Failed to publish events"),
    }
}

fn read_source(source: &Path) -> Result<String> {
    if source == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read events from stdin")?;
        Ok(content)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read events from {}", source.display()))
    }
}

/// Accepts a JSON array, a single JSON object, or one JSON document per line
fn parse_events(content: &str) -> Result<Vec<Value>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(events) => Ok(events),
            Value::Object(_) => Ok(vec![value]),
            other => bail!("Expected a JSON object or array, got {}", other),
        };
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", n + 1))
        })
        .collect()
}
