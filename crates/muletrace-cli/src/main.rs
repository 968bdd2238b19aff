//! Muletrace CLI tool.
//!
//! Runs the analysis pipeline against a file on disk and prints either the
//! raw JSON report or a human-readable summary.

use clap::{Parser, Subcommand};
use muletrace_core::config::AnalysisConfig;
use muletrace_core::types::AnalysisReport;
use muletrace_engine::Analyzer;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "muletrace")]
#[command(version, about = "Money-mule forensics over transaction batches", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a transaction file and print the report
    Analyze {
        /// Path to the CSV, TSV, XLS or XLSX file
        file: PathBuf,

        /// Print the raw JSON report instead of the summary
        #[arg(long)]
        json: bool,

        /// Optional TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective analysis configuration as TOML
    Config {
        /// Optional TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze { file, json, config } => {
            let config = load_config(config.as_deref())?;
            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload.csv");

            let report = Analyzer::new(config).analyze(&bytes, filename)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
        }

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    Ok(match path {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::from_env()?,
    })
}

fn print_summary(report: &AnalysisReport) {
    println!("Muletrace Analysis Report");
    println!("=========================");
    println!(
        "Accounts analyzed: {}",
        report.summary.total_accounts_analyzed
    );
    println!(
        "Suspicious accounts: {}",
        report.summary.suspicious_accounts_flagged
    );
    println!("Fraud rings: {}", report.summary.fraud_rings_detected);
    println!(
        "Processing time: {:.3}s",
        report.summary.processing_time_seconds
    );

    if !report.fraud_rings.is_empty() {
        println!("\nRings:");
        for ring in &report.fraud_rings {
            println!(
                "  {} [{}] risk {:.1} members {}",
                ring.ring_id,
                ring.pattern_type,
                ring.risk_score,
                ring.member_accounts.join(" -> ")
            );
        }
    }

    if !report.suspicious_accounts.is_empty() {
        println!("\nTop accounts:");
        for account in report.suspicious_accounts.iter().take(20) {
            println!(
                "  {:<20} {:>6.1}  {}  {}",
                account.account_id,
                account.suspicion_score,
                account.ring_id.as_deref().unwrap_or("-"),
                account.detected_patterns.join(", ")
            );
        }
    }
}
