//! # Muletrace Engine
//!
//! The analysis pipeline behind the `analyze` operation: multi-format
//! ingestion → directed graph construction → three pattern detectors →
//! weighted scoring → report assembly.
//!
//! The pipeline is synchronous CPU work with no I/O; the three detectors fan
//! out over a fixed width of three and join before ring identities are
//! assigned, so the report is a deterministic function of the input
//! transaction set.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use muletrace_core::config::AnalysisConfig;
//! use muletrace_engine::Analyzer;
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default());
//! let report = analyzer.analyze(csv_bytes, "transactions.csv")?;
//! println!("{} rings", report.summary.fraud_rings_detected);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod detect;
pub mod graph;
pub mod ingest;
pub mod report;
pub mod score;

use muletrace_core::cancel::CancelToken;
use muletrace_core::config::AnalysisConfig;
use muletrace_core::error::Result;
use muletrace_core::types::AnalysisReport;
use std::time::Instant;

/// The analysis pipeline entry point.
///
/// Holds only configuration; a single instance can serve any number of
/// concurrent `analyze` calls because no state is shared across requests.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Create an analyzer with the given configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze an uploaded file and produce the forensic report.
    pub fn analyze(&self, bytes: &[u8], filename: &str) -> Result<AnalysisReport> {
        self.analyze_with_cancel(bytes, filename, &CancelToken::new())
    }

    /// Analyze with cooperative cancellation.
    pub fn analyze_with_cancel(
        &self,
        bytes: &[u8],
        filename: &str,
        cancel: &CancelToken,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();

        let table = ingest::parse_table(bytes, filename)?;
        tracing::debug!(rows = table.len(), filename, "parsed transaction table");

        let graph = graph::TxGraph::from_table(&table);
        let findings = detect::run_all(&graph, &table, &self.config, cancel)?;
        let board = score::score_accounts(&findings, &graph, &table, &self.config);
        let report = report::build_report(&findings, &board, &graph, started.elapsed());

        tracing::info!(
            accounts = report.summary.total_accounts_analyzed,
            flagged = report.summary.suspicious_accounts_flagged,
            rings = report.summary.fraud_rings_detected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );
        Ok(report)
    }
}
