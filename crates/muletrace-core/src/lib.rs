//! # Muletrace Core
//!
//! Core abstractions shared by the muletrace analysis pipeline and its
//! front ends.
//!
//! This crate provides:
//! - The canonical transaction and report data model
//! - The error taxonomy separating input-shape errors from internal ones
//! - Analysis configuration with the published detection-model defaults
//! - Cooperative cancellation for long-running detectors
//! - Logging bootstrap for the service and CLI

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod observability;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::config::{
        AnalysisConfig, CycleConfig, MerchantConfig, ScoreWeights, ShellConfig, SmurfingConfig,
        VelocityConfig,
    };
    pub use crate::error::{AnalysisError, Result};
    pub use crate::types::{
        AnalysisReport, FraudRing, PatternKind, RawRing, ReportSummary, SuspiciousAccount,
        Transaction, TransactionTable,
    };
}
