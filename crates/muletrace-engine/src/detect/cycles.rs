//! Elementary circuit enumeration, bounded by cycle length.
//!
//! Every cycle is anchored at its lexicographically smallest member: the
//! search starting from an anchor only visits nodes that sort after it, so
//! each elementary circuit inside the length window is produced exactly once
//! and already in canonical rotation. Depth is capped at the maximum cycle
//! length and total edge expansions are capped by `work_cap`; hitting the cap
//! aborts the enumerator for the request with a logged note while keeping the
//! circuits found so far.

use crate::graph::TxGraph;
use muletrace_core::cancel::CancelToken;
use muletrace_core::config::CycleConfig;
use muletrace_core::error::Result;
use muletrace_core::types::{PatternKind, RawRing};

struct CycleSearch<'a> {
    graph: &'a TxGraph,
    config: &'a CycleConfig,
    cancel: &'a CancelToken,
    budget: u64,
    truncated: bool,
    found: Vec<RawRing>,
}

/// Enumerate elementary circuits with length in
/// `[config.min_length, config.max_length]`.
pub fn detect(
    graph: &TxGraph,
    config: &CycleConfig,
    cancel: &CancelToken,
) -> Result<Vec<RawRing>> {
    let mut search = CycleSearch {
        graph,
        config,
        cancel,
        budget: config.work_cap,
        truncated: false,
        found: Vec::new(),
    };

    let anchors: Vec<&str> = graph.nodes().collect();
    let mut path: Vec<&str> = Vec::with_capacity(config.max_length);
    for anchor in anchors {
        cancel.check()?;
        if search.truncated {
            break;
        }
        path.clear();
        path.push(anchor);
        search.expand(anchor, anchor, &mut path)?;
    }

    if search.truncated {
        tracing::warn!(
            work_cap = config.work_cap,
            found = search.found.len(),
            "cycle enumeration hit the work cap; returning partial findings"
        );
    }
    Ok(search.found)
}

impl<'a> CycleSearch<'a> {
    fn expand(
        &mut self,
        anchor: &'a str,
        current: &'a str,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        self.cancel.check()?;
        let graph = self.graph;
        for next in graph.successors(current) {
            if self.budget == 0 {
                self.truncated = true;
                return Ok(());
            }
            self.budget -= 1;

            if next == anchor {
                if path.len() >= self.config.min_length {
                    self.found.push(RawRing::new(
                        PatternKind::Cycle,
                        path.iter().map(|n| (*n).to_string()).collect(),
                        format!("cycle_length_{}", path.len()),
                    ));
                }
            } else if path.len() < self.config.max_length
                && next > anchor
                && !path.iter().any(|&n| n == next)
            {
                path.push(next);
                self.expand(anchor, next, path)?;
                path.pop();
                if self.truncated {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
