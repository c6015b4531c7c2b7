//! Capability-aware placement.
//!
//! GPU workloads only go to GPU nodes that are not already running a GPU
//! workload; everything else goes to any node that fits. Among eligible
//! nodes the least loaded (by resource score) wins. The order in which
//! pending workloads are considered is pluggable through [`WorkloadOrder`].

use std::collections::BTreeMap;

use edgesim_cluster::{Cluster, Node, Workload};
use tracing::debug;

use crate::error::PlacementResult;
use crate::scheduler::{Decision, Scheduler, VirtualCluster};
use crate::scorer::best_node;

/// Decides the sequence pending workloads are visited in.
pub trait WorkloadOrder {
    fn order<'a>(&self, pending: &'a [Workload]) -> Vec<&'a Workload>;
}

/// Arrival order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrder;

impl WorkloadOrder for InputOrder {
    fn order<'a>(&self, pending: &'a [Workload]) -> Vec<&'a Workload> {
        pending.iter().collect()
    }
}

/// GPU workloads before the rest, arrival order within each group.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuFirst;

impl WorkloadOrder for GpuFirst {
    fn order<'a>(&self, pending: &'a [Workload]) -> Vec<&'a Workload> {
        let mut queue: Vec<&Workload> = pending.iter().collect();
        queue.sort_by_key(|w| !w.requires_gpu());
        queue
    }
}

pub struct WaggleScheduler {
    order: Box<dyn WorkloadOrder>,
}

impl Default for WaggleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl WaggleScheduler {
    pub fn new() -> Self {
        Self::with_order(InputOrder)
    }

    pub fn with_order(order: impl WorkloadOrder + 'static) -> Self {
        Self {
            order: Box::new(order),
        }
    }
}

/// Whether `node` may take `workload` under the GPU exclusivity rule.
pub fn is_eligible(node: &Node, workload: &Workload) -> bool {
    if workload.requires_gpu() && (!node.has_gpu() || node.gpu_workload_count() > 0) {
        return false;
    }
    node.is_workload_fit(workload)
}

impl Scheduler for WaggleScheduler {
    fn name(&self) -> &str {
        "waggle"
    }

    fn step(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<Decision>> {
        let mut view = VirtualCluster::snapshot(cluster);
        let mut decisions = Vec::new();
        for workload in self.order.order(pending) {
            match best_node(view.nodes(), |n| is_eligible(n, workload), Node::resource_score) {
                Some(index) => decisions.push(view.place(index, workload)?),
                None => debug!(
                    workload = %workload.name(),
                    gpu = workload.requires_gpu(),
                    "no eligible node, deferring"
                ),
            }
        }
        Ok(decisions)
    }

    fn evaluate(&self, cluster: &Cluster) -> BTreeMap<String, f64> {
        let gpu_nodes: Vec<&Node> = cluster.nodes().iter().filter(|n| n.has_gpu()).collect();
        let occupied = gpu_nodes.iter().filter(|n| n.gpu_workload_count() > 0).count();
        let occupancy = if gpu_nodes.is_empty() {
            0.0
        } else {
            occupied as f64 / gpu_nodes.len() as f64
        };
        BTreeMap::from([
            ("gpu_nodes".to_string(), gpu_nodes.len() as f64),
            ("gpu_occupancy".to_string(), occupancy),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesim_core::{HostSpec, WorkloadSpec};

    const GPU_LABEL: &str = "waggle.io/resource.gpu";

    fn cluster(hosts: &[HostSpec]) -> Cluster {
        let mut c = Cluster::new();
        c.create_cluster(hosts).unwrap();
        c
    }

    fn gpu_scenario() -> Cluster {
        cluster(&[
            HostSpec::new("A", "xaviernx"),
            HostSpec::new("B", "xaviernx").with_label(GPU_LABEL, "true"),
        ])
    }

    fn gpu_spec(name: &str) -> WorkloadSpec {
        WorkloadSpec::new(name, "500m", "100Mi").with_label("resource.gpu", "true")
    }

    #[test]
    fn picks_the_only_fitting_node() {
        let mut c = cluster(&[
            HostSpec::new("A", "xaviernx").with_capacity("3000m", "4Gi"),
            HostSpec::new("B", "rpi").with_capacity("1000m", "1Gi"),
        ]);
        c.create_new_workloads(&[WorkloadSpec::new("w", "2000m", "3Gi")], 0).unwrap();

        let decisions = WaggleScheduler::new().step(c.pending(), &c).unwrap();
        assert_eq!(decisions, vec![Decision { workload: "w-0".into(), node: "A".into() }]);
    }

    #[test]
    fn gpu_workload_goes_to_free_gpu_node() {
        let mut c = gpu_scenario();
        c.create_new_workloads(&[gpu_spec("detector")], 0).unwrap();

        let decisions = WaggleScheduler::new().step(c.pending(), &c).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].node, "B");
    }

    #[test]
    fn occupied_gpu_node_is_not_eligible() {
        let mut c = gpu_scenario();
        c.create_new_workloads(&[gpu_spec("first")], 0).unwrap();
        c.placement("first-0", "B", 0).unwrap();
        c.create_new_workloads(&[gpu_spec("second")], 1).unwrap();

        let decisions = WaggleScheduler::new().step(c.pending(), &c).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn one_gpu_workload_per_node_within_a_pass() {
        let mut c = gpu_scenario();
        c.create_new_workloads(&[gpu_spec("a"), gpu_spec("b")], 0).unwrap();

        let decisions = WaggleScheduler::new().step(c.pending(), &c).unwrap();
        assert_eq!(decisions, vec![Decision { workload: "a-0".into(), node: "B".into() }]);
    }

    #[test]
    fn plain_workloads_prefer_least_loaded() {
        let mut c = gpu_scenario();
        c.create_new_workloads(&[WorkloadSpec::new("busy", "3000m", "1Gi")], 0).unwrap();
        c.placement("busy-0", "A", 0).unwrap();
        c.create_new_workloads(&[WorkloadSpec::new("w", "100m", "1Mi")], 0).unwrap();

        let decisions = WaggleScheduler::new().step(c.pending(), &c).unwrap();
        assert_eq!(decisions[0].node, "B");
    }

    #[test]
    fn gpu_first_order_claims_the_gpu_node_early() {
        let mut c = cluster(&[HostSpec::new("B", "rpi")
            .with_capacity("1000m", "1Gi")
            .with_label(GPU_LABEL, "true")]);
        c.create_new_workloads(
            &[
                WorkloadSpec::new("plain", "600m", "1Mi"),
                WorkloadSpec::new("vision", "600m", "1Mi").with_label("resource.gpu", "true"),
            ],
            0,
        )
        .unwrap();

        let input = WaggleScheduler::new().step(c.pending(), &c).unwrap();
        assert_eq!(input[0].workload, "plain-0");
        assert_eq!(input.len(), 1);

        let gpu_first = WaggleScheduler::with_order(GpuFirst).step(c.pending(), &c).unwrap();
        assert_eq!(gpu_first[0].workload, "vision-0");
        assert_eq!(gpu_first.len(), 1);
    }

    #[test]
    fn reports_gpu_occupancy() {
        let mut c = cluster(&[
            HostSpec::new("g1", "xaviernx").with_label(GPU_LABEL, "true"),
            HostSpec::new("g2", "xaviernx").with_label(GPU_LABEL, "true"),
            HostSpec::new("cpu", "rpi"),
        ]);
        c.create_new_workloads(&[gpu_spec("v")], 0).unwrap();
        c.placement("v-0", "g2", 0).unwrap();

        let scores = WaggleScheduler::new().evaluate(&c);
        assert_eq!(scores["gpu_nodes"], 2.0);
        assert_eq!(scores["gpu_occupancy"], 0.5);
    }
}
