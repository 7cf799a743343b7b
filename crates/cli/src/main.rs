//! Trendsite CLI - Main Entry Point
//!
//! Runs the browser QC suite against the marketing site, lints a built
//! site directory and drives the ticker engine offline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod output;

use commands::{lint, qc, ticker};
use config::{TrendsiteConfig, DEFAULT_CONFIG_FILE};

/// Exit code when the harness itself could not do its job
const EXIT_HARNESS_ERROR: i32 = 2;

/// Trendsite CLI - ticker engine and visual QC
#[derive(Parser)]
#[command(name = "trendsite")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browser-driven QC of a deployed site
    #[command(subcommand)]
    Qc(qc::QcCommands),

    /// Static lint of a built site directory
    Lint(lint::LintArgs),

    /// Ticker engine tools
    #[command(subcommand)]
    Ticker(ticker::TickerCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            EXIT_HARNESS_ERROR
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = TrendsiteConfig::load(&cli.config)?;

    match cli.command {
        Commands::Qc(cmd) => qc::execute(cmd, &config, cli.format).await,
        Commands::Lint(args) => lint::execute(args, cli.format),
        Commands::Ticker(cmd) => ticker::execute(cmd, &config, cli.format).await,
    }
}
