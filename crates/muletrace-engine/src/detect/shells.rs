//! Layered shell chain detection.
//!
//! Depth-first search over outgoing edges, at most `max_hops` deep. A simple
//! path of at least `min_hops` hops is flagged when every intermediate node
//! has undirected degree at most `max_degree`; the endpoints are exempt. The
//! search prunes the moment the node that would become an intermediate
//! exceeds the bound, so every surviving path already satisfies the degree
//! constraint. Paths are deduplicated by member set, first path wins.

use crate::graph::TxGraph;
use muletrace_core::cancel::CancelToken;
use muletrace_core::config::ShellConfig;
use muletrace_core::error::Result;
use muletrace_core::types::{PatternKind, RawRing};
use std::collections::{BTreeSet, HashSet};

const SHELL_LABEL: &str = "layered_shell_chain";

/// Detect pass-through chains of low-degree intermediaries.
pub fn detect(
    graph: &TxGraph,
    config: &ShellConfig,
    cancel: &CancelToken,
) -> Result<Vec<RawRing>> {
    let mut rings = Vec::new();
    let mut seen: HashSet<BTreeSet<&str>> = HashSet::new();
    let mut path: Vec<&str> = Vec::with_capacity(config.max_hops + 1);

    for source in graph.nodes() {
        cancel.check()?;
        path.clear();
        path.push(source);
        walk(graph, config, cancel, &mut path, &mut seen, &mut rings)?;
    }
    Ok(rings)
}

fn walk<'g>(
    graph: &'g TxGraph,
    config: &ShellConfig,
    cancel: &CancelToken,
    path: &mut Vec<&'g str>,
    seen: &mut HashSet<BTreeSet<&'g str>>,
    rings: &mut Vec<RawRing>,
) -> Result<()> {
    cancel.check()?;
    let hops = path.len() - 1;
    if hops >= config.min_hops {
        let members: BTreeSet<&str> = path.iter().copied().collect();
        if seen.insert(members) {
            rings.push(RawRing::new(
                PatternKind::Shell,
                path.iter().map(|n| (*n).to_string()).collect(),
                SHELL_LABEL,
            ));
        }
    }
    if hops == config.max_hops {
        return Ok(());
    }

    // Extending turns the current tail into an intermediate; the source and
    // the final endpoint are the only nodes exempt from the degree bound.
    let tail = path[path.len() - 1];
    if hops > 0 && graph.degree(tail) > config.max_degree {
        return Ok(());
    }

    for next in graph.successors(tail) {
        if path.iter().any(|&n| n == next) {
            continue;
        }
        path.push(next);
        walk(graph, config, cancel, path, seen, rings)?;
        path.pop();
    }
    Ok(())
}
