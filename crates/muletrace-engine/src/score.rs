//! Suspicion scoring.
//!
//! Combines per-account pattern memberships with two derived signals
//! (velocity burst, degree-centrality anomaly) and one damper (merchant
//! heuristic) into a single bounded score. Each pattern kind contributes at
//! most once per account no matter how many rings repeat it.

use crate::detect::DetectorFindings;
use crate::graph::TxGraph;
use chrono::{Duration, NaiveDateTime};
use muletrace_core::config::{AnalysisConfig, MerchantConfig, VelocityConfig};
use muletrace_core::types::{PatternKind, TransactionTable};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-account view of all incident transactions, in time order.
#[derive(Debug, Clone, Default)]
struct AccountProfile {
    timeline: Vec<NaiveDateTime>,
    amounts: Vec<f64>,
}

/// Scoring output consumed by the report builder.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    scores: HashMap<String, f64>,
    labels: HashMap<String, BTreeSet<String>>,
}

impl ScoreBoard {
    /// Final score for an account; zero when the account was not scored.
    #[must_use]
    pub fn score(&self, account: &str) -> f64 {
        self.scores.get(account).copied().unwrap_or(0.0)
    }

    /// Sorted unique labels for an account.
    #[must_use]
    pub fn labels(&self, account: &str) -> Vec<String> {
        self.labels
            .get(account)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Accounts with a positive score, in arbitrary order.
    pub fn positive_accounts(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores
            .iter()
            .filter(|(_, score)| **score > 0.0)
            .map(|(account, score)| (account.as_str(), *score))
    }
}

/// Score every account touched by the batch.
pub fn score_accounts(
    findings: &DetectorFindings,
    graph: &TxGraph,
    table: &TransactionTable,
    config: &AnalysisConfig,
) -> ScoreBoard {
    let profiles = build_profiles(table);

    // Pattern memberships and ring labels, each pattern kind kept once.
    let mut kinds: HashMap<&str, BTreeSet<PatternKind>> = HashMap::new();
    let mut ring_labels: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for ring in findings.iter() {
        for member in &ring.members {
            kinds.entry(member).or_default().insert(ring.pattern);
            ring_labels
                .entry(member)
                .or_default()
                .insert(ring.label.as_str());
        }
    }

    let (degree_mean, degree_std) = degree_stats(graph);
    let weights = &config.scoring;
    let mut board = ScoreBoard::default();

    for (account, profile) in &profiles {
        let mut score = 0.0;
        let mut labels: BTreeSet<String> = ring_labels
            .get(account.as_str())
            .map(|set| set.iter().map(|l| (*l).to_string()).collect())
            .unwrap_or_default();

        if let Some(pattern_kinds) = kinds.get(account.as_str()) {
            for kind in pattern_kinds {
                score += match kind {
                    PatternKind::Cycle => weights.cycle,
                    PatternKind::Smurfing => weights.smurfing,
                    PatternKind::Shell => weights.shell,
                };
            }
        }

        if has_velocity_burst(profile, &config.velocity) {
            score += weights.velocity;
            labels.insert("high_velocity".to_string());
        }

        if degree_std > 0.0
            && graph.degree(account) as f64 >= degree_mean + 2.0 * degree_std
        {
            score += weights.centrality;
            labels.insert("centrality_anomaly".to_string());
        }

        if is_merchant_like(profile, &config.merchant) {
            score += weights.merchant_damper;
        }

        let rounded = round_to_tenth(score.clamp(weights.floor, weights.ceiling));
        if rounded > 0.0 {
            board.scores.insert(account.clone(), rounded);
            board.labels.insert(account.clone(), labels);
        }
    }

    board
}

/// Round to one decimal place, half away from zero.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn build_profiles(table: &TransactionTable) -> BTreeMap<String, AccountProfile> {
    let mut profiles: BTreeMap<String, AccountProfile> = BTreeMap::new();
    for tx in table.rows() {
        for account in [&tx.sender, &tx.receiver] {
            let profile = profiles.entry(account.clone()).or_default();
            profile.timeline.push(tx.timestamp);
            profile.amounts.push(tx.amount);
        }
    }
    // Timelines inherit the table's time order.
    profiles
}

/// Population mean and standard deviation of the undirected degrees.
fn degree_stats(graph: &TxGraph) -> (f64, f64) {
    let n = graph.node_count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = graph.degrees().sum::<usize>() as f64 / n as f64;
    let variance = graph
        .degrees()
        .map(|d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n as f64;
    (mean, variance.sqrt())
}

/// Any window of `config.window_hours` containing at least `config.min_tx`
/// incident transactions.
fn has_velocity_burst(profile: &AccountProfile, config: &VelocityConfig) -> bool {
    let window = Duration::hours(config.window_hours);
    let timeline = &profile.timeline;
    let mut left = 0usize;
    for right in 0..timeline.len() {
        while timeline[right] - timeline[left] > window {
            left += 1;
        }
        if right - left + 1 >= config.min_tx {
            return true;
        }
    }
    false
}

/// Coefficient of variation (population stddev / mean).
///
/// `None` when the sample is empty or the mean is zero; a zero mean can only
/// happen for inter-arrival gaps when events share a timestamp, and such an
/// account must not be classed as a merchant.
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return None;
    }
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt() / mean)
}

/// Likely-merchant heuristic: long-lived account with consistent amounts and
/// even spacing. Requires at least two incident transactions.
fn is_merchant_like(profile: &AccountProfile, config: &MerchantConfig) -> bool {
    let timeline = &profile.timeline;
    if timeline.len() < 2 {
        return false;
    }

    let lifetime = timeline[timeline.len() - 1] - timeline[0];
    if lifetime < Duration::days(config.min_lifetime_days) {
        return false;
    }

    match coefficient_of_variation(&profile.amounts) {
        Some(cv) if cv <= config.amount_cv_max => {}
        _ => return false,
    }

    let gaps: Vec<f64> = timeline
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
        .collect();
    matches!(
        coefficient_of_variation(&gaps),
        Some(cv) if cv <= config.spacing_cv_max
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use muletrace_core::cancel::CancelToken;
    use muletrace_core::types::Transaction;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn tx(id: usize, sender: &str, receiver: &str, amount: f64, offset: Duration) -> Transaction {
        Transaction {
            transaction_id: format!("T{id}"),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            timestamp: base() + offset,
        }
    }

    fn score_table(rows: Vec<Transaction>) -> ScoreBoard {
        let config = AnalysisConfig::default();
        let table = TransactionTable::new(rows);
        let graph = TxGraph::from_table(&table);
        let findings =
            crate::detect::run_all(&graph, &table, &config, &CancelToken::new()).unwrap();
        score_accounts(&findings, &graph, &table, &config)
    }

    #[test]
    fn test_cycle_members_scored_once() {
        let board = score_table(vec![
            tx(1, "A", "B", 500.0, Duration::hours(0)),
            tx(2, "B", "C", 490.0, Duration::hours(1)),
            tx(3, "C", "A", 480.0, Duration::hours(2)),
        ]);
        for account in ["A", "B", "C"] {
            assert!((board.score(account) - 40.0).abs() < 0.1, "{account}");
            assert_eq!(board.labels(account), vec!["cycle_length_3".to_string()]);
        }
    }

    #[test]
    fn test_pattern_contribution_not_multiplied_by_ring_count() {
        // A and B sit on two triangles sharing the A -> B edge; the cycle
        // weight still counts once per account.
        let board = score_table(vec![
            tx(1, "A", "B", 10.0, Duration::hours(0)),
            tx(2, "B", "C", 10.0, Duration::hours(1)),
            tx(3, "C", "A", 10.0, Duration::hours(2)),
            tx(4, "B", "D", 10.0, Duration::hours(3)),
            tx(5, "D", "A", 10.0, Duration::hours(4)),
        ]);
        assert!((board.score("A") - 40.0).abs() < 0.1);
        assert!((board.score("B") - 40.0).abs() < 0.1);
    }

    #[test]
    fn test_velocity_burst_applies_without_rings() {
        // One busy account, no structural pattern: ten incident transfers in
        // an hour, alternating directions.
        let mut rows = Vec::new();
        for i in 0..10 {
            let (s, r) = if i % 2 == 0 { ("HOT", "X") } else { ("Y", "HOT") };
            rows.push(tx(i, s, r, 10.0 + i as f64, Duration::minutes(6 * i as i64)));
        }
        let board = score_table(rows);
        assert!((board.score("HOT") - 20.0).abs() < 0.1);
        assert!(board.labels("HOT").contains(&"high_velocity".to_string()));
    }

    #[test]
    fn test_nine_in_window_is_not_a_burst() {
        // Nine transfers in under an hour, cycling three recipients so the
        // degree spread stays unremarkable.
        let mut rows = Vec::new();
        for i in 0..9 {
            rows.push(tx(i, "HOT", &format!("X{}", i % 3), 10.0, Duration::minutes(6 * i as i64)));
        }
        let board = score_table(rows);
        assert_eq!(board.score("HOT"), 0.0);
    }

    #[test]
    fn test_centrality_anomaly_flags_hub() {
        // Star: HUB touches 10 leaves spread over days (no velocity, no
        // smurfing window).
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(tx(
                i,
                &format!("L{i}"),
                "HUB",
                10.0 + i as f64 * 3.0,
                Duration::days(i as i64 * 4),
            ));
        }
        let board = score_table(rows);
        assert!((board.score("HUB") - 10.0).abs() < 0.1);
        assert_eq!(
            board.labels("HUB"),
            vec!["centrality_anomaly".to_string()]
        );
    }

    #[test]
    fn test_uniform_degrees_never_centrality_anomalies() {
        // Two disjoint pairs: every degree is 1, sigma is 0.
        let board = score_table(vec![
            tx(1, "A", "B", 10.0, Duration::hours(0)),
            tx(2, "C", "D", 10.0, Duration::hours(1)),
        ]);
        for account in ["A", "B", "C", "D"] {
            assert_eq!(board.score(account), 0.0);
        }
    }

    #[test]
    fn test_merchant_damper_reduces_smurfing_score() {
        // 101 payments of exactly 100.00 every 7.2 hours: 30-day lifetime,
        // zero amount and spacing variation, first ten payers land inside a
        // 72-hour window. Plus a noisy unrelated hub so the population degree
        // spread keeps M below the centrality threshold.
        let mut rows = Vec::new();
        for i in 0..101usize {
            rows.push(tx(
                i,
                &format!("P{:02}", i % 10),
                "M",
                100.0,
                Duration::seconds(25_920 * i as i64),
            ));
        }
        for j in 0..30usize {
            rows.push(tx(
                200 + j,
                "H",
                &format!("Q{j:02}"),
                50.0 + 13.0 * j as f64,
                Duration::hours(48 * j as i64),
            ));
        }
        let board = score_table(rows);
        // Smurfing (+30) dampened by the merchant heuristic (-25).
        assert!((board.score("M") - 5.0).abs() < 0.1, "got {}", board.score("M"));
        assert!(board.labels("M").contains(&"fan_in_smurfing".to_string()));
    }

    #[test]
    fn test_two_transactions_cannot_make_a_merchant_span_short() {
        // Lifetime below 30 days disqualifies regardless of variation.
        let profile = AccountProfile {
            timeline: vec![base(), base() + Duration::days(10)],
            amounts: vec![100.0, 100.0],
        };
        assert!(!is_merchant_like(&profile, &MerchantConfig::default()));
    }

    #[test]
    fn test_single_transaction_never_merchant() {
        let profile = AccountProfile {
            timeline: vec![base()],
            amounts: vec![100.0],
        };
        assert!(!is_merchant_like(&profile, &MerchantConfig::default()));
    }

    #[test]
    fn test_identical_timestamps_never_merchant() {
        // All events share one instant: gap mean is zero, CV is infinite.
        let profile = AccountProfile {
            timeline: vec![base(); 5],
            amounts: vec![100.0; 5],
        };
        assert!(!is_merchant_like(&profile, &MerchantConfig::default()));
    }

    #[test]
    fn test_even_cadence_merchant_detected() {
        let profile = AccountProfile {
            timeline: (0..10).map(|i| base() + Duration::days(i * 5)).collect(),
            amounts: vec![250.0; 10],
        };
        assert!(is_merchant_like(&profile, &MerchantConfig::default()));
    }

    #[test]
    fn test_erratic_amounts_not_merchant() {
        let profile = AccountProfile {
            timeline: (0..10).map(|i| base() + Duration::days(i * 5)).collect(),
            amounts: (0..10).map(|i| 100.0 + 400.0 * (i % 3) as f64).collect(),
        };
        assert!(!is_merchant_like(&profile, &MerchantConfig::default()));
    }

    #[test]
    fn test_cv_edge_cases() {
        assert!(coefficient_of_variation(&[]).is_none());
        assert!(coefficient_of_variation(&[0.0, 0.0]).is_none());
        assert_eq!(coefficient_of_variation(&[5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_scores_clamped_to_ceiling() {
        let mut weights = muletrace_core::config::ScoreWeights::default();
        weights.cycle = 120.0;
        let config = AnalysisConfig::default().with_scoring(weights);

        let rows = vec![
            tx(1, "A", "B", 500.0, Duration::hours(0)),
            tx(2, "B", "C", 490.0, Duration::hours(1)),
            tx(3, "C", "A", 480.0, Duration::hours(2)),
        ];
        let table = TransactionTable::new(rows);
        let graph = TxGraph::from_table(&table);
        let findings =
            crate::detect::run_all(&graph, &table, &config, &CancelToken::new()).unwrap();
        let board = score_accounts(&findings, &graph, &table, &config);
        assert!((board.score("A") - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(5.04), 5.0);
        assert_eq!(round_to_tenth(5.05), 5.1);
        assert_eq!(round_to_tenth(99.96), 100.0);
    }
}
