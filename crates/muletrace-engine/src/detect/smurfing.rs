//! Fan-in / fan-out smurfing detection.
//!
//! Each account's incoming and outgoing streams are scanned separately with a
//! two-pointer sliding window. A running multiset keeps the distinct
//! counterparty count as the window advances; a counterparty counts once no
//! matter how many transactions it contributes. Only the first qualifying
//! window per (account, direction) is emitted.

use chrono::{Duration, NaiveDateTime};
use muletrace_core::cancel::CancelToken;
use muletrace_core::config::SmurfingConfig;
use muletrace_core::error::Result;
use muletrace_core::types::{PatternKind, RawRing, TransactionTable};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stream orientation relative to the focus account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    FanIn,
    FanOut,
}

impl Direction {
    const fn label(self) -> &'static str {
        match self {
            Direction::FanIn => "fan_in_smurfing",
            Direction::FanOut => "fan_out_smurfing",
        }
    }
}

/// Detect fan-in and fan-out bursts across all accounts.
///
/// Fan-in findings come first, each direction ordered by focus account, so
/// the raw output is deterministic.
pub fn detect(
    table: &TransactionTable,
    config: &SmurfingConfig,
    cancel: &CancelToken,
) -> Result<Vec<RawRing>> {
    let mut rings = Vec::new();
    scan_direction(table, config, cancel, Direction::FanIn, &mut rings)?;
    scan_direction(table, config, cancel, Direction::FanOut, &mut rings)?;
    Ok(rings)
}

fn scan_direction(
    table: &TransactionTable,
    config: &SmurfingConfig,
    cancel: &CancelToken,
    direction: Direction,
    rings: &mut Vec<RawRing>,
) -> Result<()> {
    // Focus account -> (timestamp, counterparty). Streams inherit the table's
    // time order.
    let mut streams: BTreeMap<&str, Vec<(NaiveDateTime, &str)>> = BTreeMap::new();
    for tx in table.rows() {
        let (focus, partner) = match direction {
            Direction::FanIn => (tx.receiver.as_str(), tx.sender.as_str()),
            Direction::FanOut => (tx.sender.as_str(), tx.receiver.as_str()),
        };
        streams.entry(focus).or_default().push((tx.timestamp, partner));
    }

    let window = Duration::hours(config.window_hours);
    for (focus, stream) in &streams {
        cancel.check()?;
        if let Some(ring) = first_window(focus, stream, window, config, direction) {
            rings.push(ring);
        }
    }
    Ok(())
}

/// Slide the window over one stream and emit the first one that reaches the
/// distinct-counterparty threshold.
fn first_window(
    focus: &str,
    stream: &[(NaiveDateTime, &str)],
    window: Duration,
    config: &SmurfingConfig,
    direction: Direction,
) -> Option<RawRing> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut distinct = 0usize;
    let mut left = 0usize;

    for right in 0..stream.len() {
        let slot = counts.entry(stream[right].1).or_insert(0);
        if *slot == 0 {
            distinct += 1;
        }
        *slot += 1;

        while stream[right].0 - stream[left].0 > window {
            if let Some(slot) = counts.get_mut(stream[left].1) {
                *slot -= 1;
                if *slot == 0 {
                    distinct -= 1;
                }
            }
            left += 1;
        }

        if distinct >= config.min_endpoints {
            let partners: BTreeSet<&str> =
                stream[left..=right].iter().map(|(_, p)| *p).collect();
            let mut members = vec![focus.to_string()];
            if config.include_counterparties {
                members.extend(partners.iter().map(|p| (*p).to_string()));
            }
            return Some(RawRing::new(
                PatternKind::Smurfing,
                members,
                direction.label(),
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use muletrace_core::types::Transaction;

    fn tx(id: usize, sender: &str, receiver: &str, hour_offset: i64) -> Transaction {
        Transaction {
            transaction_id: format!("T{id}"),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount: 100.0,
            timestamp: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + Duration::hours(hour_offset),
        }
    }

    fn fan_in_rows(sender_count: usize) -> Vec<Transaction> {
        (0..sender_count)
            .map(|i| tx(i, &format!("S{i:02}"), "HUB", i as i64))
            .collect()
    }

    fn detect_default(rows: Vec<Transaction>) -> Vec<RawRing> {
        detect(
            &TransactionTable::new(rows),
            &SmurfingConfig::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_ten_distinct_senders_flagged() {
        let rings = detect_default(fan_in_rows(10));
        assert_eq!(rings.len(), 1);

        let ring = &rings[0];
        assert_eq!(ring.pattern, PatternKind::Smurfing);
        assert_eq!(ring.label, "fan_in_smurfing");
        assert_eq!(ring.members.len(), 11);
        assert_eq!(ring.members[0], "HUB");
        assert!(ring.members.contains(&"S00".to_string()));
        assert!(ring.members.contains(&"S09".to_string()));
    }

    #[test]
    fn test_nine_distinct_senders_not_flagged() {
        assert!(detect_default(fan_in_rows(9)).is_empty());
    }

    #[test]
    fn test_repeat_senders_count_once() {
        // Five senders, each wiring twice: 10 transactions, 5 counterparties.
        let rows = (0..10)
            .map(|i| tx(i, &format!("S{}", i % 5), "HUB", i as i64))
            .collect();
        assert!(detect_default(rows).is_empty());
    }

    #[test]
    fn test_window_excludes_stale_counterparties() {
        // Nine senders inside 72h, a tenth 100 hours before the rest.
        let mut rows = vec![tx(99, "EARLY", "HUB", 0)];
        rows.extend((0..9).map(|i| tx(i, &format!("S{i}"), "HUB", 100 + i as i64)));
        assert!(detect_default(rows).is_empty());

        // Pull the early sender inside the window and it tips the count.
        let mut rows = vec![tx(99, "EARLY", "HUB", 95)];
        rows.extend((0..9).map(|i| tx(i, &format!("S{i}"), "HUB", 100 + i as i64)));
        assert_eq!(detect_default(rows).len(), 1);
    }

    #[test]
    fn test_fan_out_direction() {
        let rows = (0..10)
            .map(|i| tx(i, "HUB", &format!("R{i:02}"), i as i64))
            .collect();
        let rings = detect_default(rows);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].label, "fan_out_smurfing");
        assert_eq!(rings[0].members[0], "HUB");
    }

    #[test]
    fn test_single_window_per_account_and_direction() {
        // Twenty distinct senders over a tight burst: one fan-in ring, not
        // one per qualifying window.
        let rows = (0..20)
            .map(|i| tx(i, &format!("S{i:02}"), "HUB", i as i64 / 4))
            .collect();
        let rings = detect_default(rows);
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn test_hub_only_membership_when_configured() {
        let config = SmurfingConfig {
            include_counterparties: false,
            ..Default::default()
        };
        let rings = detect(
            &TransactionTable::new(fan_in_rows(10)),
            &config,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(rings[0].members, vec!["HUB".to_string()]);
    }

    #[test]
    fn test_boundary_exactly_window_width_included() {
        // First and last transactions exactly 72h apart stay in one window.
        let mut rows: Vec<Transaction> = (0..9)
            .map(|i| tx(i, &format!("S{i}"), "HUB", i as i64))
            .collect();
        rows.push(tx(9, "S9", "HUB", 72));
        assert_eq!(detect_default(rows).len(), 1);
    }
}
