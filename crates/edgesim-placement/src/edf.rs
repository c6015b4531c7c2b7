//! Earliest-deadline-first placement.

use edgesim_cluster::{Cluster, Workload};
use tracing::debug;

use crate::error::PlacementResult;
use crate::scheduler::{Decision, Scheduler, VirtualCluster};

/// Visits pending workloads by ascending deadline (arrival order breaks
/// ties) and puts each on the first node, in cluster order, that fits it.
#[derive(Debug, Clone, Default)]
pub struct EdfScheduler;

impl EdfScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for EdfScheduler {
    fn name(&self) -> &str {
        "edf"
    }

    fn step(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<Decision>> {
        let mut queue: Vec<&Workload> = pending.iter().collect();
        queue.sort_by_key(|w| w.deadline());

        let mut view = VirtualCluster::snapshot(cluster);
        let mut decisions = Vec::new();
        for workload in queue {
            match view.nodes().iter().position(|n| n.is_workload_fit(workload)) {
                Some(index) => decisions.push(view.place(index, workload)?),
                None => debug!(workload = %workload.name(), "no node fits, deferring"),
            }
        }
        Ok(decisions)
    }
}
