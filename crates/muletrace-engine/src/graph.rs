//! Directed transaction graph construction.
//!
//! One linear pass folds the table into a directed graph aggregated per
//! ordered account pair, together with an undirected degree map counting
//! distinct neighbors in either direction. Adjacency is kept in sorted maps
//! so every traversal downstream is deterministic.

use chrono::NaiveDateTime;
use muletrace_core::types::TransactionTable;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Aggregated record for one ordered `(sender, receiver)` pair.
#[derive(Debug, Clone, Default)]
pub struct EdgeRecord {
    /// Number of transactions on the edge.
    pub count: u64,
    /// Sum of transaction amounts.
    pub total_amount: f64,
    /// `(timestamp, amount)` per transaction, in table order.
    pub timeline: Vec<(NaiveDateTime, f64)>,
}

/// Directed transaction graph plus the undirected degree map.
///
/// Immutable after construction; the detectors share it read-only.
#[derive(Debug, Clone, Default)]
pub struct TxGraph {
    edges: HashMap<(String, String), EdgeRecord>,
    successors: BTreeMap<String, BTreeSet<String>>,
    neighbors: BTreeMap<String, BTreeSet<String>>,
}

impl TxGraph {
    /// Fold a transaction table into a graph.
    #[must_use]
    pub fn from_table(table: &TransactionTable) -> Self {
        let mut graph = Self::default();
        for tx in table.rows() {
            let record = graph
                .edges
                .entry((tx.sender.clone(), tx.receiver.clone()))
                .or_default();
            record.count += 1;
            record.total_amount += tx.amount;
            record.timeline.push((tx.timestamp, tx.amount));

            graph
                .successors
                .entry(tx.sender.clone())
                .or_default()
                .insert(tx.receiver.clone());
            graph
                .neighbors
                .entry(tx.sender.clone())
                .or_default()
                .insert(tx.receiver.clone());
            graph
                .neighbors
                .entry(tx.receiver.clone())
                .or_default()
                .insert(tx.sender.clone());
        }
        graph
    }

    /// Number of distinct accounts.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// All accounts in sorted order.
    pub fn nodes<'g>(&'g self) -> impl Iterator<Item = &'g str> + 'g {
        self.neighbors.keys().map(String::as_str)
    }

    /// Outgoing neighbors of `node` in sorted order.
    pub fn successors<'g>(&'g self, node: &str) -> impl Iterator<Item = &'g str> + 'g {
        self.successors
            .get(node)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// The aggregated edge record for `(from, to)`, if any transaction exists.
    #[must_use]
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeRecord> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    /// Undirected degree: distinct neighbors over both directions.
    #[must_use]
    pub fn degree(&self, node: &str) -> usize {
        self.neighbors.get(node).map_or(0, BTreeSet::len)
    }

    /// Degree values for all nodes, in node order.
    pub fn degrees<'g>(&'g self) -> impl Iterator<Item = usize> + 'g {
        self.neighbors.values().map(BTreeSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use muletrace_core::types::Transaction;

    fn tx(id: &str, sender: &str, receiver: &str, amount: f64, hour: u32) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            timestamp: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
        }
    }

    fn sample_graph() -> TxGraph {
        TxGraph::from_table(&TransactionTable::new(vec![
            tx("T1", "A", "B", 100.0, 1),
            tx("T2", "A", "B", 50.0, 2),
            tx("T3", "B", "A", 25.0, 3),
            tx("T4", "B", "C", 10.0, 4),
        ]))
    }

    #[test]
    fn test_node_set_is_union_of_endpoints() {
        let graph = sample_graph();
        let nodes: Vec<&str> = graph.nodes().collect();
        assert_eq!(nodes, ["A", "B", "C"]);
    }

    #[test]
    fn test_edges_aggregate_per_ordered_pair() {
        let graph = sample_graph();

        let ab = graph.edge("A", "B").unwrap();
        assert_eq!(ab.count, 2);
        assert_eq!(ab.total_amount, 150.0);
        assert_eq!(ab.timeline.len(), 2);

        let ba = graph.edge("B", "A").unwrap();
        assert_eq!(ba.count, 1);

        assert!(graph.edge("C", "A").is_none());
    }

    #[test]
    fn test_undirected_degree_counts_distinct_neighbors() {
        let graph = sample_graph();
        // A touches only B (both directions count once).
        assert_eq!(graph.degree("A"), 1);
        // B touches A and C.
        assert_eq!(graph.degree("B"), 2);
        assert_eq!(graph.degree("C"), 1);
        assert_eq!(graph.degree("missing"), 0);
    }

    #[test]
    fn test_successors_are_sorted() {
        let graph = TxGraph::from_table(&TransactionTable::new(vec![
            tx("T1", "A", "Z", 1.0, 1),
            tx("T2", "A", "B", 1.0, 2),
            tx("T3", "A", "M", 1.0, 3),
        ]));
        let succ: Vec<&str> = graph.successors("A").collect();
        assert_eq!(succ, ["B", "M", "Z"]);
        assert_eq!(graph.successors("Z").count(), 0);
    }
}
