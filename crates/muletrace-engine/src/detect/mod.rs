//! Pattern detectors and the parallel fan-out that joins them.
//!
//! The three detectors are independent and share only the immutable graph and
//! table, so they run concurrently with a fixed fan-out of three. Findings
//! are joined before any ring identity is assigned, which keeps the output a
//! deterministic function of the input regardless of scheduling.

pub mod cycles;
pub mod shells;
pub mod smurfing;

use crate::graph::TxGraph;
use muletrace_core::cancel::CancelToken;
use muletrace_core::config::AnalysisConfig;
use muletrace_core::error::Result;
use muletrace_core::types::{RawRing, TransactionTable};
use std::time::Instant;

/// Raw findings grouped per detector, in the fixed report order.
#[derive(Debug, Clone, Default)]
pub struct DetectorFindings {
    /// Elementary circuits, canonical rotation order.
    pub cycles: Vec<RawRing>,
    /// Fan-in / fan-out windows.
    pub smurfing: Vec<RawRing>,
    /// Low-degree pass-through chains.
    pub shells: Vec<RawRing>,
}

impl DetectorFindings {
    /// All findings in cycle → smurfing → shell order.
    pub fn iter(&self) -> impl Iterator<Item = &RawRing> {
        self.cycles
            .iter()
            .chain(self.smurfing.iter())
            .chain(self.shells.iter())
    }

    /// Total number of raw findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len() + self.smurfing.len() + self.shells.len()
    }

    /// True when no detector produced a finding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the three detectors over the shared immutable graph.
pub fn run_all(
    graph: &TxGraph,
    table: &TransactionTable,
    config: &AnalysisConfig,
    cancel: &CancelToken,
) -> Result<DetectorFindings> {
    let started = Instant::now();
    let (cycles, (smurfing, shells)) = rayon::join(
        || cycles::detect(graph, &config.cycle, cancel),
        || {
            rayon::join(
                || smurfing::detect(table, &config.smurfing, cancel),
                || shells::detect(graph, &config.shell, cancel),
            )
        },
    );

    let findings = DetectorFindings {
        cycles: cycles?,
        smurfing: smurfing?,
        shells: shells?,
    };
    tracing::debug!(
        cycles = findings.cycles.len(),
        smurfing = findings.smurfing.len(),
        shells = findings.shells.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "detectors joined"
    );
    Ok(findings)
}
