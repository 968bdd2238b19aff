//! # Muletrace
//!
//! Money-mule forensics over transaction batches.
//!
//! Muletrace ingests a table of directed money transfers (CSV, TSV, or
//! Excel), builds a directed transaction graph, and detects three structural
//! laundering patterns:
//!
//! - **Cycles**: circular fund routing through 3-5 accounts
//! - **Smurfing**: fan-in / fan-out bursts across many counterparties
//! - **Layered shells**: multi-hop chains through low-degree pass-through
//!   accounts
//!
//! Each implicated account receives a bounded suspicion score combining its
//! pattern memberships with velocity and centrality signals, dampened for
//! merchant-like activity; implicated accounts are grouped into rings and
//! emitted as a structured report.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use muletrace::prelude::*;
//! use muletrace::Analyzer;
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default());
//! let report = analyzer.analyze(&std::fs::read("batch.csv")?, "batch.csv")?;
//! for ring in &report.fraud_rings {
//!     println!("{} [{}] {:?}", ring.ring_id, ring.pattern_type, ring.member_accounts);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export member crates.
pub use muletrace_core as core;
pub use muletrace_engine as engine;

pub use muletrace_engine::Analyzer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use muletrace_core::prelude::*;
    pub use muletrace_engine::Analyzer;
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
