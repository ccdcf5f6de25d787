//! Subscribe command - create or look up a subscription

use anyhow::{Context, Result};
use nakadi_client::{Client, ReadFrom, SubscriptionRequest};

use crate::output::{subscription_pairs, OutputContext};

/// Create a subscription, or fetch the existing one for the same key
pub async fn subscribe(
    client: &Client,
    app: &str,
    event_types: &[String],
    group: Option<&str>,
    read_from: Option<ReadFrom>,
    ctx: &OutputContext,
) -> Result<()> {
    let request = build_request(app, event_types, group, read_from)?;

    let subscription = client
        .subscribe_with(&request)
        .await
        .context("Failed to create subscription")?;

    ctx.print_kv(&subscription_pairs(&subscription));
    Ok(())
}

fn build_request(
    app: &str,
    event_types: &[String],
    group: Option<&str>,
    read_from: Option<ReadFrom>,
) -> Result<SubscriptionRequest> {
    let (first, rest) = event_types
        .split_first()
        .context("At least one event type is required")?;

    let mut request = rest.iter().fold(
        SubscriptionRequest::new(app, first.as_str(), group.unwrap_or_default()),
        |request, event_type| request.with_event_type(event_type.as_str()),
    );
    if let Some(read_from) = read_from {
        request = request.with_read_from(read_from);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let types = vec!["a".to_string(), "b".to_string()];
        let request = build_request("app", &types, Some("g"), Some(ReadFrom::Begin)).unwrap();

        assert_eq!(request.owning_application, "app");
        assert_eq!(request.event_types, types);
        assert_eq!(request.consumer_group, "g");
        assert_eq!(request.read_from, Some(ReadFrom::Begin));
    }

    #[test]
    fn test_build_request_default_group() {
        let request = build_request("app", &["a".to_string()], None, None).unwrap();

        assert!(request.consumer_group.is_empty());
        assert_eq!(request.read_from, None);
    }

    #[test]
    fn test_build_request_needs_event_type() {
        assert!(build_request("app", &[], None, None).is_err());
    }
}
