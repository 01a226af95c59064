// src/main.rs

//! Regatta Resume CLI
//!
//! Local entry point for running aggregation searches and validating
//! configuration.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use regatta_resume::{
    error::Result,
    export,
    models::{Config, ResultQuery},
    pipeline::{self, Progress, Stage},
};

/// regatta-resume - sailor result aggregator
#[derive(Parser, Debug)]
#[command(
    name = "regatta-resume",
    version,
    about = "Aggregates a sailor's regatta results from public scoring sites"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search both sources for a sailor's results
    Search {
        /// Target sailor name (case-insensitive)
        #[arg(long)]
        name: String,

        /// Only include regattas on or after this date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Only include regattas on or before this date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Maximum results to collect before matching
        #[arg(long)]
        max: Option<usize>,

        /// Only check regattas whose name contains this substring
        #[arg(long)]
        contains: Option<String>,

        /// Seconds to wait for the dynamic source's results tables
        #[arg(long)]
        timeout: Option<u64>,

        /// Drop records without a parsable event date
        #[arg(long)]
        exclude_undated: bool,

        /// Write the results CSV to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the match audit log CSV to this path
        #[arg(long)]
        match_log: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Search {
            name,
            start_date,
            end_date,
            max,
            contains,
            timeout,
            exclude_undated,
            output,
            match_log,
        } => {
            let mut query = ResultQuery::new(name);
            query.start_date = start_date;
            query.end_date = end_date;
            query.name_contains = contains;
            query.exclude_undated = exclude_undated;
            if let Some(max) = max {
                query.max_results = max;
            }
            if let Some(timeout) = timeout {
                query.timeout_secs = timeout;
            }

            // Stream progress to the log while the run is going.
            let (progress, mut events) = Progress::channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match event.stage {
                        Stage::Warning | Stage::Error => log::warn!("{}", event.message),
                        _ => log::info!("{}", event.message),
                    }
                }
            });

            let outcome = pipeline::run_search(&config, &query, &progress).await;
            drop(progress);
            let _ = printer.await;
            let outcome = outcome?;

            for record in &outcome.results {
                let date = record
                    .event_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "----------".to_string());
                let place = record
                    .place
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{date}  {place:>3}  [{}] {}",
                    record.source, record.regatta_name
                );
            }

            let merged = outcome.groups.iter().filter(|g| !g.absorbed.is_empty()).count();
            log::info!(
                "{} results, {} merged groups, {} warnings",
                outcome.results.len(),
                merged,
                outcome.warnings.len()
            );

            if let Some(path) = output {
                export::write_results_csv(&path, &outcome.results)?;
                log::info!("Results written to {}", path.display());
            }
            if let Some(path) = match_log {
                export::write_match_log_csv(&path, &outcome.groups)?;
                log::info!("Match log written to {}", path.display());
            }
        }

        Command::Validate => {
            config.validate()?;
            log::info!("Configuration OK");
        }
    }

    Ok(())
}
