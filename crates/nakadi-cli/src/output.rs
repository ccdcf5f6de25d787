//! Output formatting for nakadi-cli (table, json)

use clap::ValueEnum;
use colored::Colorize;
use nakadi_client::{BatchItemResponse, EventBatch, Subscription};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format, one document per line when streaming
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message to stderr (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }

    /// Print key-value pairs
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }
}

/// Key-value view of a subscription
pub fn subscription_pairs(sub: &Subscription) -> Vec<(&'static str, String)> {
    vec![
        ("id", sub.id.clone()),
        ("owning_application", sub.owning_application.clone()),
        ("event_types", sub.event_types.join(", ")),
        ("consumer_group", sub.consumer_group.clone()),
        (
            "read_from",
            sub.read_from
                .map(|r| format_json_value(&serde_json::to_value(r).unwrap_or_default()))
                .unwrap_or_default(),
        ),
        (
            "created_at",
            sub.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ),
    ]
}

/// One row per event in a publish response
#[derive(Tabled, Serialize)]
pub struct BatchItemRow {
    #[tabled(rename = "EID")]
    pub eid: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Step")]
    pub step: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl From<&BatchItemResponse> for BatchItemRow {
    fn from(item: &BatchItemResponse) -> Self {
        let text = |v: serde_json::Value| format_json_value(&v);
        Self {
            eid: item.eid.clone().unwrap_or_default(),
            status: text(serde_json::to_value(item.publishing_status).unwrap_or_default()),
            step: item
                .step
                .map(|s| text(serde_json::to_value(s).unwrap_or_default()))
                .unwrap_or_default(),
            detail: item.detail.clone().unwrap_or_default(),
        }
    }
}

/// Render one stream batch as a single line
pub fn format_batch(batch: &EventBatch, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format!(
            "[{}] partition={} offset={} events={}",
            batch.cursor.event_type,
            batch.cursor.partition,
            batch.cursor.offset,
            batch.events.len()
        ),
        OutputFormat::Json => serde_json::to_string(batch).unwrap_or_default(),
    }
}

pub fn format_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
