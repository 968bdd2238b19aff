//! Report assembly.
//!
//! Canonicalizes raw findings into final rings, assigns stable identifiers,
//! joins accounts to rings, filters below-threshold accounts, and fills the
//! summary. Ring identity is the canonical rotation for cycles and the
//! member set for smurfing and shell findings; buckets are emitted in the
//! fixed cycle → smurfing → shell order and sorted by canonical tuple inside
//! each bucket, so identifiers never depend on detector scheduling.

use crate::detect::DetectorFindings;
use crate::graph::TxGraph;
use crate::score::{round_to_tenth, ScoreBoard};
use muletrace_core::types::{
    AnalysisReport, FraudRing, PatternKind, RawRing, ReportSummary, SuspiciousAccount,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Assemble the final report.
pub fn build_report(
    findings: &DetectorFindings,
    board: &ScoreBoard,
    graph: &TxGraph,
    elapsed: Duration,
) -> AnalysisReport {
    let fraud_rings = canonical_rings(findings, board);

    // Smallest ring id containing each account. Rings are already in id
    // order, so the first insertion wins.
    let mut account_ring: HashMap<&str, &str> = HashMap::new();
    for ring in &fraud_rings {
        for member in &ring.member_accounts {
            account_ring.entry(member).or_insert(&ring.ring_id);
        }
    }

    let mut suspicious_accounts: Vec<SuspiciousAccount> = board
        .positive_accounts()
        .map(|(account, score)| SuspiciousAccount {
            account_id: account.to_string(),
            suspicion_score: score,
            detected_patterns: board.labels(account),
            ring_id: account_ring.get(account).map(|id| (*id).to_string()),
        })
        .collect();
    suspicious_accounts.sort_by(|a, b| {
        b.suspicion_score
            .partial_cmp(&a.suspicion_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    let summary = ReportSummary {
        total_accounts_analyzed: graph.node_count(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: fraud_rings.len(),
        processing_time_seconds: round_to_thousandth(elapsed.as_secs_f64()),
    };

    AnalysisReport {
        suspicious_accounts,
        fraud_rings,
        summary,
        transactions: Vec::new(),
    }
}

/// Deduplicate raw findings into final rings with stable identifiers.
fn canonical_rings(findings: &DetectorFindings, board: &ScoreBoard) -> Vec<FraudRing> {
    let buckets: [(PatternKind, &[RawRing]); 3] = [
        (PatternKind::Cycle, &findings.cycles),
        (PatternKind::Smurfing, &findings.smurfing),
        (PatternKind::Shell, &findings.shells),
    ];

    let mut rings = Vec::new();
    let mut index = 0usize;
    for (pattern, bucket) in buckets {
        // Identity key -> first finding carrying it. BTreeMap iteration
        // yields the canonical-tuple order inside the bucket.
        let mut canonical: BTreeMap<Vec<String>, &RawRing> = BTreeMap::new();
        for ring in bucket {
            let key = match pattern {
                PatternKind::Cycle => canonical_rotation(&ring.members),
                PatternKind::Smurfing | PatternKind::Shell => sorted_members(&ring.members),
            };
            canonical.entry(key).or_insert(ring);
        }

        for (key, ring) in canonical {
            index += 1;
            let member_accounts = match pattern {
                PatternKind::Cycle => key,
                PatternKind::Smurfing | PatternKind::Shell => ring.members.clone(),
            };
            let risk_score = round_to_tenth(
                member_accounts
                    .iter()
                    .map(|m| board.score(m))
                    .sum::<f64>()
                    / member_accounts.len() as f64,
            );
            rings.push(FraudRing {
                ring_id: format!("RING_{index:03}"),
                member_count: member_accounts.len(),
                member_accounts,
                pattern_type: pattern,
                risk_score,
            });
        }
    }
    rings
}

/// Rotate a cycle to start at its lexicographically smallest member,
/// preserving direction.
fn canonical_rotation(members: &[String]) -> Vec<String> {
    let pivot = members
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    members[pivot..]
        .iter()
        .chain(members[..pivot].iter())
        .cloned()
        .collect()
}

fn sorted_members(members: &[String]) -> Vec<String> {
    let mut sorted = members.to_vec();
    sorted.sort();
    sorted
}

fn round_to_thousandth(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
