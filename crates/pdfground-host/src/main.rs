//! pdfground - browse and manage the local operation history.

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use clap::{ArgAction, Parser, Subcommand};
use pdfground_core::{
    format_file_size, get_operation_icon, get_operation_label, DownloadOutcome, HistoryFilter,
};
use pdfground_host::logging::{self, LogConfig, LogFormat, TargetLevel};
use pdfground_host::{Config, HostState};
use pdfground_types::{HistoryItem, Operation};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfground")]
#[command(about = "Local history of PDF operations and their output files")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the data directory from config
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Warnings and errors only
    #[arg(short, long)]
    quiet: bool,

    /// Pin one log target (e.g. "retention=debug"). Repeatable.
    /// Bare targets are placed under "pdfground::".
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_pins: Vec<TargetLevel>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List history entries, newest first
    List {
        /// Only entries of this operation
        #[arg(long)]
        operation: Option<Operation>,
        /// Only entries whose details contain this text
        #[arg(long, value_name = "TEXT")]
        matching: Option<String>,
        /// Maximum number of entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Record an operation, optionally with its output file
    Add {
        operation: Operation,
        file_name: String,
        #[arg(long)]
        details: Option<String>,
        /// File whose contents are retained with the entry
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Save the file of an entry into the downloads directory
    Download { id: String },
    /// Remove one entry and its file
    Delete { id: String },
    /// Remove every entry and file
    Clear,
    /// Storage statistics and per-operation counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::new(cli.verbose, cli.quiet)
        .with_pins(cli.log_pins)
        .with_format(cli.log_format);
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let state = HostState::open(config).await?;
    let history = &state.history;

    match cli.command {
        Command::List {
            operation,
            matching,
            limit,
        } => {
            let filter = HistoryFilter {
                operation,
                details_contains: matching,
                limit,
            };
            let items = if filter == HistoryFilter::default() {
                history.get_history().await
            } else {
                history.recent_history(&filter).await
            };
            if items.is_empty() {
                println!("No history yet.");
            }
            for item in &items {
                println!("{}", describe(item));
            }
        }
        Command::Add {
            operation,
            file_name,
            details,
            file,
            mime_type,
        } => {
            let status = match file {
                Some(path) => {
                    let data = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    history
                        .add_to_history_with_file(
                            &operation,
                            &file_name,
                            details.as_deref().unwrap_or_default(),
                            &data,
                            mime_type.as_deref(),
                        )
                        .await
                }
                None => {
                    history
                        .add_to_history(&operation, &file_name, details.as_deref())
                        .await
                }
            };
            if !status.is_persisted() {
                bail!("entry was not saved ({:?})", status);
            }
        }
        Command::Download { id } => match history.download_from_history(&id).await {
            DownloadOutcome::Delivered { file_name, size } => println!(
                "Saved {} ({}) to {}",
                file_name,
                format_file_size(size),
                state.config.downloads_dir.display()
            ),
            DownloadOutcome::NoFile => bail!("entry {} has no file", id),
            DownloadOutcome::Evicted => bail!("the file of entry {} is no longer stored", id),
            DownloadOutcome::UnknownEntry => bail!("no entry with id {}", id),
            DownloadOutcome::Failed => bail!("download of {} failed", id),
        },
        Command::Delete { id } => {
            let status = history.delete_history_item(&id).await;
            if !status.is_persisted() {
                bail!("delete was not saved ({:?})", status);
            }
        }
        Command::Clear => {
            let status = history.clear_history().await;
            if !status.is_persisted() {
                bail!("clear was not saved ({:?})", status);
            }
        }
        Command::Stats => {
            let stats = history.get_stats().await;
            println!("Entries: {}", stats.history_count);
            println!(
                "Files:   {} ({})",
                stats.total_files,
                format_file_size(stats.total_size)
            );
            for count in history.operation_counts().await {
                println!(
                    "  {} {:<22} {}",
                    get_operation_icon(&count.operation),
                    get_operation_label(&count.operation),
                    count.count
                );
            }
        }
    }

    Ok(())
}

fn describe(item: &HistoryItem) -> String {
    let when = Local
        .timestamp_millis_opt(item.timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let mut line = format!(
        "{} {}  {}  {}  [{}]",
        get_operation_icon(&item.operation),
        when,
        get_operation_label(&item.operation),
        item.file_name,
        item.id
    );
    if let Some(details) = &item.details {
        line.push_str(&format!("  {}", details));
    }
    match item.file_size {
        Some(size) => line.push_str(&format!("  {}", format_file_size(size))),
        None if item.file_evicted() => line.push_str("  (file evicted)"),
        None => {}
    }
    line
}
