//! Node ranking for placement decisions.
//!
//! Policies filter the node set down to eligible candidates and order them
//! by a load score, lowest first. The sort is stable, so equal scores keep
//! the cluster's iteration order.

use edgesim_cluster::Node;

/// Score of an eligible node. `index` points into the node slice it was
/// ranked from.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeScore {
    pub index: usize,
    pub score: f64,
}

/// Score every eligible node and return them sorted ascending.
pub fn rank_nodes(
    nodes: &[Node],
    eligible: impl Fn(&Node) -> bool,
    score: impl Fn(&Node) -> f64,
) -> Vec<NodeScore> {
    let mut scores: Vec<NodeScore> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| eligible(n))
        .map(|(index, n)| NodeScore { index, score: score(n) })
        .collect();

    scores.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

/// Lowest-scoring eligible node, if any.
pub fn best_node(
    nodes: &[Node],
    eligible: impl Fn(&Node) -> bool,
    score: impl Fn(&Node) -> f64,
) -> Option<usize> {
    rank_nodes(nodes, eligible, score).first().map(|s| s.index)
}

/// Mean resource score across the cluster.
pub fn mean_utilization(nodes: &[Node]) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    nodes.iter().map(Node::resource_score).sum::<f64>() / nodes.len() as f64
}

/// Spread between the most and least loaded node.
pub fn load_imbalance(nodes: &[Node]) -> f64 {
    let scores = nodes.iter().map(Node::resource_score);
    let max = scores.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = scores.fold(f64::INFINITY, f64::min);
    if nodes.is_empty() { 0.0 } else { max - min }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesim_cluster::{DeviceProfile, PowerCurve, Workload};
    use edgesim_core::Labels;

    fn make_node(name: &str, cpu: u64, used_cpu: u64) -> Node {
        let profile = DeviceProfile {
            name: "test",
            cpu_millicores: cpu,
            memory_bytes: 1 << 30,
            power: PowerCurve::EDGE_DEFAULT,
        };
        let mut node = Node::new(name, &profile, Labels::new());
        if used_cpu > 0 {
            node.place_pod(Workload::new(&format!("{name}-load"), used_cpu, 1), 0).unwrap();
        }
        node
    }

    #[test]
    fn ranks_least_loaded_first() {
        let nodes = vec![
            make_node("n1", 1_000, 800),
            make_node("n2", 1_000, 100),
            make_node("n3", 1_000, 500),
        ];
        let ranked = rank_nodes(&nodes, |_| true, Node::resource_score);
        let order: Vec<usize> = ranked.iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn ties_keep_iteration_order() {
        let nodes = vec![
            make_node("n1", 2_000, 1_000),
            make_node("n2", 4_000, 2_000),
            make_node("n3", 1_000, 500),
        ];
        assert_eq!(best_node(&nodes, |_| true, Node::resource_score), Some(0));
        assert_eq!(best_node(&nodes, |n| n.name() != "n1", Node::resource_score), Some(1));
    }

    #[test]
    fn no_eligible_node() {
        let nodes = vec![make_node("n1", 1_000, 0)];
        assert_eq!(best_node(&nodes, |_| false, Node::resource_score), None);
    }

    #[test]
    fn utilization_summaries() {
        let nodes = vec![make_node("n1", 1_000, 800), make_node("n2", 1_000, 200)];
        assert!((mean_utilization(&nodes) - 0.5).abs() < 1e-12);
        assert!((load_imbalance(&nodes) - 0.6).abs() < 1e-12);
        assert_eq!(load_imbalance(&[]), 0.0);
        assert_eq!(mean_utilization(&[]), 0.0);
    }
}
