//! Scheduler contract and the tentative-placement workspace policies share.

use std::collections::BTreeMap;

use edgesim_cluster::{Cluster, Node, Workload};
use serde::Serialize;

use crate::error::PlacementResult;

/// Bind `workload` to `node`. Decisions are applied in the order returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub workload: String,
    pub node: String,
}

impl Decision {
    pub fn new(workload: &Workload, node: &Node) -> Self {
        Self {
            workload: workload.name().to_string(),
            node: node.name().to_string(),
        }
    }
}

/// A scheduling policy.
///
/// `step` sees the pending queue in arrival order and the cluster as it
/// stands after this tick's node updates. It must not assume earlier
/// decisions of the same call have been applied; policies that want to
/// account for them do so on a [`VirtualCluster`].
pub trait Scheduler {
    fn name(&self) -> &str;

    fn step(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<Decision>>;

    /// Policy-specific scores, published as `score_scheduler_<key>`.
    fn evaluate(&self, _cluster: &Cluster) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

/// Private copy of the node set. Tentative placements change the load
/// later decisions of the same pass see, without touching the cluster.
#[derive(Debug, Clone)]
pub struct VirtualCluster {
    nodes: Vec<Node>,
    step: u64,
}

impl VirtualCluster {
    pub fn snapshot(cluster: &Cluster) -> Self {
        Self {
            nodes: cluster.nodes().to_vec(),
            step: cluster.current_step(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Place a copy of `workload` on the node at `index` and return the
    /// matching decision.
    pub fn place(&mut self, index: usize, workload: &Workload) -> PlacementResult<Decision> {
        let node = &mut self.nodes[index];
        node.place_pod(workload.clone(), self.step)?;
        Ok(Decision::new(workload, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesim_core::{HostSpec, WorkloadSpec};

    #[test]
    fn virtual_placement_leaves_cluster_untouched() {
        let mut cluster = Cluster::new();
        cluster
            .create_cluster(&[HostSpec::new("a", "rpi").with_capacity("1000m", "1Gi")])
            .unwrap();
        cluster
            .create_new_workloads(&[WorkloadSpec::new("w", "600m", "1Mi")], 0)
            .unwrap();

        let mut view = VirtualCluster::snapshot(&cluster);
        let w = &cluster.pending()[0];
        let decision = view.place(0, w).unwrap();

        assert_eq!(decision, Decision { workload: "w-0".into(), node: "a".into() });
        assert_eq!(view.nodes()[0].cpu_in_use(), 600);
        assert!(!view.nodes()[0].is_workload_fit(w));
        assert_eq!(cluster.nodes()[0].cpu_in_use(), 0);
        assert_eq!(cluster.pending().len(), 1);
    }
}
