//! Logs command - view and manage the local event log

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use tally_core::services::{EntryPoint, LoggingService};

use super::get_tally_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy the log database to a file
    Export { output: PathBuf },
}

impl LogsCommands {
    /// Whether output was requested as JSON
    pub fn json(&self) -> bool {
        matches!(
            self,
            LogsCommands::List { json: true, .. } | LogsCommands::Stats { json: true }
        )
    }
}

fn get_logging_service() -> Result<LoggingService> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)?;
    LoggingService::new(&tally_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                output::print_json(&entries)?;
                return Ok(());
            }
            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "Command", "Backend", "Error"]);
            for entry in entries {
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.event,
                    entry.command.unwrap_or_default(),
                    entry.backend.unwrap_or_default(),
                    entry.error_message.map(|e| e.red().to_string()).unwrap_or_default(),
                ]);
            }
            println!("{}", table);
        }
        LogsCommands::Clear { older_than_days, force } => {
            let cutoff = Utc::now() - Duration::days(older_than_days);

            if !force
                && !Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = service.delete_before(cutoff.timestamp_millis())?;
            println!("Deleted {} log entries", deleted);
        }
        LogsCommands::Stats { json } => {
            let stats = service.stats()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                let mut value = serde_json::to_value(&stats)?;
                value["database_path"] = serde_json::json!(db_path.to_string_lossy());
                value["database_size_bytes"] = serde_json::json!(size_bytes);
                output::print_json(&value)?;
                return Ok(());
            }

            println!("{}", "Log Statistics".bold());
            println!("  Total entries: {}", stats.total);
            println!("  Errors: {}", stats.errors);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!("  Range: {} to {}", format_timestamp(oldest), format_timestamp(newest));
            }
            println!("  Database: {}", db_path.display());
            println!("  Size: {} bytes", size_bytes);
            if !stats.top_events.is_empty() {
                println!();
                println!("{}", "Top events".bold());
                for (event, count) in &stats.top_events {
                    println!("  {:<24} {}", event, count);
                }
            }
        }
        LogsCommands::Export { output: path } => {
            let written = service.export(&path)?;
            output::success(&format!("Log database copied to {}", written.display()));
        }
    }

    Ok(())
}
