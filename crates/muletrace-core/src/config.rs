//! Analysis configuration.
//!
//! All detection thresholds and scoring weights live here, one sub-config per
//! concern, each with defaults matching the published detection model. The
//! aggregate can be loaded from a TOML file or from `MULETRACE_*` environment
//! variables at startup; nothing is reconfigurable per request.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cycle detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Shortest elementary circuit reported.
    pub min_length: usize,
    /// Longest elementary circuit explored.
    pub max_length: usize,
    /// Edge-expansion budget before the enumerator aborts for this request.
    pub work_cap: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 5,
            work_cap: 5_000_000,
        }
    }
}

/// Smurfing (fan-in / fan-out) detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmurfingConfig {
    /// Minimum distinct counterparties inside one window.
    pub min_endpoints: usize,
    /// Sliding window length in hours.
    pub window_hours: i64,
    /// Whether window counterparties become ring members alongside the hub.
    pub include_counterparties: bool,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            min_endpoints: 10,
            window_hours: 72,
            include_counterparties: true,
        }
    }
}

/// Layered-shell chain detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Minimum chain length (hops) to flag.
    pub min_hops: usize,
    /// Maximum search depth in hops.
    pub max_hops: usize,
    /// Maximum undirected degree for an intermediate node.
    pub max_degree: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            min_hops: 3,
            max_hops: 5,
            max_degree: 3,
        }
    }
}

/// Velocity burst parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Burst window length in hours.
    pub window_hours: i64,
    /// Minimum incident transactions inside one window.
    pub min_tx: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            min_tx: 10,
        }
    }
}

/// Suspicion score weights.
///
/// The final score is the clamped sum of the triggered contributions, rounded
/// half away from zero to one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Contribution for appearing in any cycle ring.
    pub cycle: f64,
    /// Contribution for appearing in any smurfing ring.
    pub smurfing: f64,
    /// Contribution for appearing in any shell ring.
    pub shell: f64,
    /// Contribution for a velocity burst.
    pub velocity: f64,
    /// Contribution for a degree-centrality anomaly.
    pub centrality: f64,
    /// Negative adjustment for merchant-like accounts.
    pub merchant_damper: f64,
    /// Score floor after summation.
    pub floor: f64,
    /// Score ceiling after summation.
    pub ceiling: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cycle: 40.0,
            smurfing: 30.0,
            shell: 25.0,
            velocity: 20.0,
            centrality: 10.0,
            merchant_damper: -25.0,
            floor: 0.0,
            ceiling: 100.0,
        }
    }
}

/// Merchant false-positive heuristic thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Minimum account lifetime in days.
    pub min_lifetime_days: i64,
    /// Maximum coefficient of variation of incident amounts.
    pub amount_cv_max: f64,
    /// Maximum coefficient of variation of inter-arrival intervals.
    pub spacing_cv_max: f64,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            min_lifetime_days: 30,
            amount_cv_max: 0.30,
            spacing_cv_max: 0.50,
        }
    }
}

/// Aggregate analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cycle detector parameters.
    pub cycle: CycleConfig,
    /// Smurfing detector parameters.
    pub smurfing: SmurfingConfig,
    /// Shell detector parameters.
    pub shell: ShellConfig,
    /// Velocity burst parameters.
    pub velocity: VelocityConfig,
    /// Scoring weights.
    pub scoring: ScoreWeights,
    /// Merchant heuristic thresholds.
    pub merchant: MerchantConfig,
}

impl AnalysisConfig {
    /// Load configuration from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("MULETRACE_CYCLE_MAX_LENGTH") {
            config.cycle.max_length = parse_env("MULETRACE_CYCLE_MAX_LENGTH", &v)?;
        }
        if let Ok(v) = std::env::var("MULETRACE_CYCLE_WORK_CAP") {
            config.cycle.work_cap = parse_env("MULETRACE_CYCLE_WORK_CAP", &v)?;
        }
        if let Ok(v) = std::env::var("MULETRACE_SMURFING_MIN_ENDPOINTS") {
            config.smurfing.min_endpoints = parse_env("MULETRACE_SMURFING_MIN_ENDPOINTS", &v)?;
        }
        if let Ok(v) = std::env::var("MULETRACE_SMURFING_WINDOW_HOURS") {
            config.smurfing.window_hours = parse_env("MULETRACE_SMURFING_WINDOW_HOURS", &v)?;
        }
        if let Ok(v) = std::env::var("MULETRACE_SHELL_MAX_DEGREE") {
            config.shell.max_degree = parse_env("MULETRACE_SHELL_MAX_DEGREE", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AnalysisError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.cycle.min_length < 2 {
            return Err(AnalysisError::config("cycle.min_length must be at least 2"));
        }
        if self.cycle.min_length > self.cycle.max_length {
            return Err(AnalysisError::config(
                "cycle.min_length must not exceed cycle.max_length",
            ));
        }
        if self.shell.min_hops == 0 || self.shell.min_hops > self.shell.max_hops {
            return Err(AnalysisError::config(
                "shell.min_hops must be in 1..=shell.max_hops",
            ));
        }
        if self.smurfing.min_endpoints == 0 || self.smurfing.window_hours <= 0 {
            return Err(AnalysisError::config("smurfing thresholds must be positive"));
        }
        if self.velocity.min_tx == 0 || self.velocity.window_hours <= 0 {
            return Err(AnalysisError::config("velocity thresholds must be positive"));
        }
        if self.scoring.floor > self.scoring.ceiling {
            return Err(AnalysisError::config(
                "scoring.floor must not exceed scoring.ceiling",
            ));
        }
        Ok(())
    }

    /// Set the smurfing configuration.
    #[must_use]
    pub fn with_smurfing(mut self, smurfing: SmurfingConfig) -> Self {
        self.smurfing = smurfing;
        self
    }

    /// Set the scoring weights.
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoreWeights) -> Self {
        self.scoring = scoring;
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| AnalysisError::config(format!("invalid value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_detection_model() {
        let config = AnalysisConfig::default();
        assert_eq!(config.cycle.min_length, 3);
        assert_eq!(config.cycle.max_length, 5);
        assert_eq!(config.smurfing.min_endpoints, 10);
        assert_eq!(config.smurfing.window_hours, 72);
        assert_eq!(config.shell.min_hops, 3);
        assert_eq!(config.shell.max_hops, 5);
        assert_eq!(config.shell.max_degree, 3);
        assert_eq!(config.velocity.window_hours, 24);
        assert_eq!(config.velocity.min_tx, 10);
        assert_eq!(config.scoring.cycle, 40.0);
        assert_eq!(config.scoring.smurfing, 30.0);
        assert_eq!(config.scoring.shell, 25.0);
        assert_eq!(config.scoring.merchant_damper, -25.0);
        assert_eq!(config.merchant.min_lifetime_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut config = AnalysisConfig::default();
        config.cycle.min_length = 6;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.shell.min_hops = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_overlays_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            [smurfing]
            min_endpoints = 5
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.smurfing.min_endpoints, 5);
        assert_eq!(config.smurfing.window_hours, 72);
        assert_eq!(config.cycle.max_length, 5);
    }
}
