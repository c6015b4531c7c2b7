//! Per-tick metric aggregation.
//!
//! Flattens the cluster into a single frame of named gauges:
//!
//! - `node_<name>_<metric>` for every node and every entry of [`NODE_METRICS`]
//! - `cluster_pending_workloads`, `cluster_total_workloads`

use std::collections::BTreeMap;

use edgesim_cluster::{Cluster, Node};

/// One tick's worth of metrics, keyed by metric name.
pub type MetricFrame = BTreeMap<String, f64>;

/// Per-node metric suffixes, in exposition order.
pub const NODE_METRICS: [&str; 7] = [
    "cpu",
    "memory",
    "power",
    "power_moving_average",
    "energy",
    "finished_workloads",
    "running_workloads",
];

pub const CLUSTER_PENDING: &str = "cluster_pending_workloads";
pub const CLUSTER_TOTAL: &str = "cluster_total_workloads";

/// Prefix for policy scores merged into a frame by the runner.
pub const SCORE_PREFIX: &str = "score_scheduler_";

pub fn node_key(node: &str, metric: &str) -> String {
    format!("node_{node}_{metric}")
}

fn node_values(node: &Node) -> [f64; 7] {
    let m = node.metrics();
    [
        m.cpu_used as f64,
        m.memory_used as f64,
        m.power_watts,
        m.power_moving_average,
        m.energy_consumed,
        m.finished_count as f64,
        node.running_count() as f64,
    ]
}

/// Snapshot the cluster into a metric frame.
pub fn aggregate(cluster: &Cluster) -> MetricFrame {
    let mut frame = MetricFrame::new();
    for node in cluster.nodes() {
        for (metric, value) in NODE_METRICS.iter().zip(node_values(node)) {
            frame.insert(node_key(node.name(), metric), value);
        }
    }
    frame.insert(CLUSTER_PENDING.to_string(), cluster.pending().len() as f64);
    frame.insert(CLUSTER_TOTAL.to_string(), cluster.workloads_total() as f64);
    frame
}

/// Split a `node_<name>_<metric>` key. Node names may contain underscores,
/// so the metric is matched as a known suffix.
pub fn split_node_key(key: &str) -> Option<(&str, &'static str)> {
    let rest = key.strip_prefix("node_")?;
    // Longest suffix first so `power_moving_average` wins over `power`.
    let mut metrics = NODE_METRICS;
    metrics.sort_by_key(|m| std::cmp::Reverse(m.len()));
    metrics.into_iter().find_map(|metric| {
        let node = rest.strip_suffix(metric)?.strip_suffix('_')?;
        (!node.is_empty()).then_some((node, metric))
    })
}
