//! CLI entry point for the Pokémon GO event pipeline.
//!
//! Provides subcommands for building the base event dataset, staging and
//! combining per-event detail documents, and re-flattening a dataset.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pogo_events::{
    config::Paths,
    fetch::BasicClient,
    model::DetailDocument,
    output::{append_record, print_pretty},
    pipeline,
    stats::RunStats,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "pogo_events")]
#[command(about = "Builds the Pokémon GO event dataset", long_about = None)]
struct Cli {
    /// Data directory (defaults to $POGO_DATA_DIR, then "data")
    #[arg(short, long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the events listing with the date feed and write the base dataset
    Events {
        /// Path to file or URL of the events date feed
        #[arg(short, long, value_name = "FILE_OR_URL")]
        feed: String,

        /// JSON file of rows scraped from the events page
        #[arg(short, long, value_name = "FILE")]
        listing: PathBuf,
    },
    /// Stage a detail document for the next combine
    Detail {
        /// Event id the document belongs to
        id: String,

        /// Detail kind, e.g. "generic" or "community-day"
        kind: String,

        /// JSON file holding the document's data
        #[arg(value_name = "FILE")]
        data: PathBuf,

        /// Appended to the file name so several documents can share an id
        #[arg(short, long, default_value = "")]
        suffix: String,
    },
    /// Merge staged details into the base dataset and write all outputs
    Combine {
        /// Leave the detail directory in place afterwards
        #[arg(long, default_value_t = false)]
        keep_details: bool,
    },
    /// Re-flatten an existing dataset in place
    Flatten {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Events { .. } => "events",
            Commands::Detail { .. } => "detail",
            Commands::Combine { .. } => "combine",
            Commands::Flatten { .. } => "flatten",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/pogo_events.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("pogo_events.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let paths = cli.data_dir.map(Paths::new).unwrap_or_else(Paths::from_env);
    let command = cli.command.name();
    let mut stats = RunStats::new(command);

    match run(cli.command, &paths, &mut stats).await {
        Ok(()) => {
            print_pretty(&stats);
            info!(
                command,
                raw_records = stats.raw_records,
                deduplicated = stats.deduplicated,
                duplicate_groups = stats.duplicate_groups,
                detail_documents = stats.detail_documents,
                details_applied = stats.details_applied,
                details_malformed = stats.details_malformed,
                details_unmatched = stats.details_unmatched,
                flattened = stats.flattened,
                global_events = stats.global_events,
                event_types = stats.event_types,
                merge_pct = stats.merge_pct(),
                "Run complete"
            );
            append_record(&paths.run_log(), &stats)?;
            Ok(())
        }
        Err(e) => {
            error!(command, error = %format!("{e:#}"), "Run failed");
            let failed = stats.with_error(&format!("{command}_error"), &format!("{e:#}"));
            if let Err(log_err) = append_record(&paths.run_log(), &failed) {
                error!(error = %log_err, "Failed to record run history");
            }
            Err(e)
        }
    }
}

async fn run(command: Commands, paths: &Paths, stats: &mut RunStats) -> Result<()> {
    match command {
        Commands::Events { feed, listing } => {
            let client = BasicClient::new()?;
            pipeline::build_base(&client, paths, &feed, &listing, stats).await?;
        }
        Commands::Detail {
            id,
            kind,
            data,
            suffix,
        } => {
            let text = std::fs::read_to_string(&data)
                .with_context(|| format!("failed to read {}", data.display()))?;
            let value = serde_json::from_str(&text)
                .with_context(|| format!("invalid JSON in {}", data.display()))?;
            let doc = DetailDocument::new(id, kind, value);
            let path = pipeline::stage_detail(paths, &doc, &suffix)?;
            info!(path = %path.display(), "Staged detail document");
        }
        Commands::Combine { keep_details } => {
            pipeline::combine(paths, keep_details, stats)?;
        }
        Commands::Flatten { file } => {
            pipeline::reflatten(&file, stats)?;
        }
    }

    Ok(())
}
