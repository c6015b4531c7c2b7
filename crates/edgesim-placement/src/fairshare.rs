//! Least-loaded placement.

use std::collections::BTreeMap;

use edgesim_cluster::{Cluster, Node, Workload};
use tracing::debug;

use crate::error::PlacementResult;
use crate::scheduler::{Decision, Scheduler, VirtualCluster};
use crate::scorer::{best_node, load_imbalance, mean_utilization};

/// Puts each workload, in arrival order, on the fitting node with the
/// least CPU in use. Earlier decisions of the same pass count as load.
#[derive(Debug, Clone, Default)]
pub struct FairshareScheduler;

impl FairshareScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for FairshareScheduler {
    fn name(&self) -> &str {
        "fairshare"
    }

    fn step(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<Decision>> {
        let mut view = VirtualCluster::snapshot(cluster);
        let mut decisions = Vec::new();
        for workload in pending {
            let choice = best_node(
                view.nodes(),
                |n| n.is_workload_fit(workload),
                |n| n.cpu_in_use() as f64,
            );
            match choice {
                Some(index) => decisions.push(view.place(index, workload)?),
                None => debug!(workload = %workload.name(), "no node fits, deferring"),
            }
        }
        Ok(decisions)
    }

    fn evaluate(&self, cluster: &Cluster) -> BTreeMap<String, f64> {
        let nodes: &[Node] = cluster.nodes();
        BTreeMap::from([
            ("load_imbalance".to_string(), load_imbalance(nodes)),
            ("mean_utilization".to_string(), mean_utilization(nodes)),
        ])
    }
}
