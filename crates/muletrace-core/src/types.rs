//! Canonical data model: transactions, rings, and the report schema.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Transactions
// ============================================================================

/// One validated money transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Unique id within the batch after deduplication.
    pub transaction_id: String,
    /// Paying account.
    pub sender: String,
    /// Receiving account, never equal to `sender`.
    pub receiver: String,
    /// Positive finite amount.
    pub amount: f64,
    /// Naive local instant.
    pub timestamp: NaiveDateTime,
}

/// Ordered, deduplicated transaction sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionTable {
    rows: Vec<Transaction>,
}

impl TransactionTable {
    /// Build a table from validated rows.
    ///
    /// Rows are ordered by `(timestamp, transaction_id)` so the table, and
    /// everything derived from it, is a pure function of the row set rather
    /// than of the input file order.
    #[must_use]
    pub fn new(mut rows: Vec<Transaction>) -> Self {
        rows.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        Self { rows }
    }

    /// The rows in timestamp order.
    #[must_use]
    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Detector Findings
// ============================================================================

/// Structural pattern classes produced by the detectors.
///
/// The declaration order is the fixed report order: cycle rings receive the
/// lowest identifiers, shell rings the highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Circular fund routing (elementary circuit).
    Cycle,
    /// Fan-in / fan-out burst across many counterparties.
    Smurfing,
    /// Multi-hop chain through low-degree intermediaries.
    Shell,
}

impl PatternKind {
    /// The wire name of the pattern.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Cycle => "cycle",
            PatternKind::Smurfing => "smurfing",
            PatternKind::Shell => "shell",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detector finding before canonicalization.
///
/// Member order is meaningful: rotation order for cycles, hub first for
/// smurfing windows, path order for shell chains. All members of one finding
/// carry the same label.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRing {
    /// Which detector produced the finding.
    pub pattern: PatternKind,
    /// Implicated accounts, in detector-specific order.
    pub members: Vec<String>,
    /// Per-member pattern label, e.g. `cycle_length_3`.
    pub label: String,
}

impl RawRing {
    /// Create a new finding.
    #[must_use]
    pub fn new(pattern: PatternKind, members: Vec<String>, label: impl Into<String>) -> Self {
        Self {
            pattern,
            members,
            label: label.into(),
        }
    }
}

// ============================================================================
// Report Schema
// ============================================================================

/// One entry in the `suspicious_accounts` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    /// Account identifier.
    pub account_id: String,
    /// Composite suspicion score in `[0, 100]`, one decimal.
    pub suspicion_score: f64,
    /// Sorted unique pattern labels that contributed.
    pub detected_patterns: Vec<String>,
    /// Smallest ring id containing the account, if any.
    pub ring_id: Option<String>,
}

/// One entry in the `fraud_rings` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    /// Stable identifier of the form `RING_001`.
    pub ring_id: String,
    /// Member accounts in canonical order.
    pub member_accounts: Vec<String>,
    /// Which detector class produced the ring.
    pub pattern_type: PatternKind,
    /// Mean member suspicion score, one decimal.
    pub risk_score: f64,
    /// Number of member accounts.
    pub member_count: usize,
}

/// Top-level report counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Distinct accounts in the transaction graph.
    pub total_accounts_analyzed: usize,
    /// Accounts with a positive suspicion score.
    pub suspicious_accounts_flagged: usize,
    /// Rings detected across all patterns.
    pub fraud_rings_detected: usize,
    /// Wall time of the pipeline in seconds, three decimals.
    pub processing_time_seconds: f64,
}

/// Reserved per-transaction echo. The pipeline always emits an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTransaction {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Paying account.
    pub sender_id: String,
    /// Receiving account.
    pub receiver_id: String,
    /// Transfer amount.
    pub amount: f64,
    /// Original timestamp rendering.
    pub timestamp: String,
}

/// The full forensic assessment for one analyzed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Accounts with a positive suspicion score, highest first.
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    /// Detected rings ordered by ring id.
    pub fraud_rings: Vec<FraudRing>,
    /// Aggregate counters.
    pub summary: ReportSummary,
    /// Reserved; always empty.
    #[serde(default)]
    pub transactions: Vec<ReportTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn tx(id: &str, day: u32, hour: u32) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender: "A".to_string(),
            receiver: "B".to_string(),
            amount: 100.0,
            timestamp: ts(day, hour),
        }
    }

    #[test]
    fn test_table_sorts_by_timestamp_then_id() {
        let table = TransactionTable::new(vec![tx("T3", 2, 0), tx("T2", 1, 5), tx("T1", 1, 5)]);
        let ids: Vec<&str> = table
            .rows()
            .iter()
            .map(|t| t.transaction_id.as_str())
            .collect();
        assert_eq!(ids, ["T1", "T2", "T3"]);
    }

    #[test]
    fn test_pattern_kind_wire_names() {
        assert_eq!(PatternKind::Cycle.as_str(), "cycle");
        assert_eq!(PatternKind::Smurfing.as_str(), "smurfing");
        assert_eq!(PatternKind::Shell.as_str(), "shell");
        assert_eq!(
            serde_json::to_string(&PatternKind::Shell).unwrap(),
            "\"shell\""
        );
    }

    #[test]
    fn test_pattern_kind_report_order() {
        assert!(PatternKind::Cycle < PatternKind::Smurfing);
        assert!(PatternKind::Smurfing < PatternKind::Shell);
    }

    #[test]
    fn test_report_json_shape() {
        let report = AnalysisReport {
            suspicious_accounts: vec![SuspiciousAccount {
                account_id: "ACC_9".to_string(),
                suspicion_score: 40.0,
                detected_patterns: vec!["cycle_length_3".to_string()],
                ring_id: Some("RING_001".to_string()),
            }],
            fraud_rings: vec![],
            summary: ReportSummary {
                total_accounts_analyzed: 3,
                suspicious_accounts_flagged: 1,
                fraud_rings_detected: 0,
                processing_time_seconds: 0.012,
            },
            transactions: vec![],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["suspicious_accounts"][0]["account_id"], "ACC_9");
        assert_eq!(json["suspicious_accounts"][0]["suspicion_score"], 40.0);
        assert_eq!(json["summary"]["total_accounts_analyzed"], 3);
        assert!(json["transactions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_null_ring_id_serializes_as_null() {
        let account = SuspiciousAccount {
            account_id: "ACC_1".to_string(),
            suspicion_score: 20.0,
            detected_patterns: vec!["high_velocity".to_string()],
            ring_id: None,
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json["ring_id"].is_null());
    }
}
