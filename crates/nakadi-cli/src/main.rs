//! Nakadi CLI - Command-line tool for the Nakadi event broker
//!
//! Create subscriptions, publish events and tail subscription streams.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nakadi_client::{Client, ClientBuilder, ReadFrom, StreamOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "nakadi")]
#[command(author, version, about = "Nakadi event broker CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Broker URL
    #[arg(short, long, env = "NAKADI_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "NAKADI_CONFIG")]
    config: Option<PathBuf>,

    /// Bearer token sent with every request
    #[arg(long, env = "NAKADI_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// File holding the bearer token, re-read before every request (ignored with --token)
    #[arg(long, env = "NAKADI_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a subscription, or show the existing one
    Subscribe {
        /// Owning application
        #[arg(long)]
        app: String,

        /// Event type(s) to subscribe to
        #[arg(long = "event-type", required = true)]
        event_types: Vec<String>,

        /// Consumer group (broker default when omitted)
        #[arg(long)]
        group: Option<String>,

        /// Where a new subscription starts reading
        #[arg(long, value_enum)]
        read_from: Option<ReadFromArg>,
    },

    /// Publish events from a JSON file
    Publish {
        /// Event type name
        #[arg(long)]
        event_type: String,

        /// JSON array, object or JSON lines; "-" reads stdin
        #[arg(default_value = "-")]
        file: PathBuf,
    },

    /// Print batches from a subscription stream
    Stream {
        /// Subscription ID
        subscription_id: String,

        /// Maximum events per batch
        #[arg(long)]
        batch_limit: Option<u32>,

        /// Events after which the broker ends the stream
        #[arg(long)]
        stream_limit: Option<u32>,

        /// Seconds the broker waits to fill a batch
        #[arg(long)]
        batch_flush_timeout: Option<u32>,

        /// Seconds after which the broker ends the stream
        #[arg(long)]
        stream_timeout: Option<u32>,

        /// Uncommitted events the broker sends before pausing
        #[arg(long)]
        max_uncommitted_events: Option<u32>,

        /// Largest accepted stream frame in bytes
        #[arg(long)]
        max_frame_size: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReadFromArg {
    Begin,
    End,
}

impl From<ReadFromArg> for ReadFrom {
    fn from(arg: ReadFromArg) -> Self {
        match arg {
            ReadFromArg::Begin => ReadFrom::Begin,
            ReadFromArg::End => ReadFrom::End,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(
        cli.url.as_deref(),
        cli.timeout,
        cli.token.as_deref(),
        cli.token_file.as_deref(),
    );

    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);
    let client = create_client(merged)?;

    match cli.command {
        Commands::Subscribe {
            app,
            event_types,
            group,
            read_from,
        } => {
            commands::subscribe(
                &client,
                &app,
                &event_types,
                group.as_deref(),
                read_from.map(ReadFrom::from),
                &ctx,
            )
            .await?;
        }

        Commands::Publish { event_type, file } => {
            commands::publish(&client, &event_type, &file, &ctx).await?;
        }

        Commands::Stream {
            subscription_id,
            batch_limit,
            stream_limit,
            batch_flush_timeout,
            stream_timeout,
            max_uncommitted_events,
            max_frame_size,
        } => {
            let options = StreamOptions {
                batch_limit,
                stream_limit,
                batch_flush_timeout,
                stream_timeout,
                max_uncommitted_events,
                max_frame_size,
            };
            commands::stream(&client, &subscription_id, options, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a Nakadi client from the merged configuration
fn create_client(merged: MergedConfig) -> Result<Client> {
    merged
        .token
        .apply(ClientBuilder::from_config(&merged.client))
        .build()
        .context("Failed to create Nakadi client")
}
