//! Cluster state container.
//!
//! Nodes live in an arena indexed by name and keep the order of the host
//! specs they were built from; that order is the iteration order every
//! scheduling policy sees. Pending workloads keep their arrival order.

use std::collections::HashMap;

use edgesim_core::{HostSpec, WorkloadSpec, format_cpu, format_memory};
use tracing::{debug, info, warn};

use crate::error::{ClusterError, ClusterResult};
use crate::node::Node;
use crate::workload::Workload;

/// Result of applying one placement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The node accepted the workload.
    Placed,
    /// The node could not fit the workload; it stays pending.
    Rejected,
}

/// Contract shared by the in-memory cluster and any backend that mirrors
/// decisions onto a live orchestrator.
pub trait ClusterBackend {
    fn create_cluster(&mut self, hosts: &[HostSpec]) -> ClusterResult<()>;

    fn create_new_workloads(&mut self, specs: &[WorkloadSpec], step: u64) -> ClusterResult<()>;

    /// Advance every node to `step`, returning the workloads that finished.
    fn update(&mut self, step: u64) -> ClusterResult<Vec<Workload>>;

    fn placement(&mut self, workload: &str, node: &str, step: u64) -> ClusterResult<PlacementOutcome>;

    fn cleanup(&mut self) -> ClusterResult<()>;

    /// The simulated state scheduling policies read from.
    fn state(&self) -> &Cluster;
}

#[derive(Debug, Clone)]
pub struct Cluster {
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    pending: Vec<Workload>,
    current_step: u64,
    workloads_total: u64,
    runtime_steps: u64,
    default_deadline: u64,
}

impl Default for Cluster {
    fn default() -> Self {
        Self::new()
    }
}

impl Cluster {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            pending: Vec::new(),
            current_step: 0,
            workloads_total: 0,
            runtime_steps: 3,
            default_deadline: 5,
        }
    }

    /// Steps a placed workload runs for.
    pub fn with_runtime_steps(mut self, runtime_steps: u64) -> Self {
        self.runtime_steps = runtime_steps;
        self
    }

    /// Deadline assigned to workloads whose spec has none.
    pub fn with_default_deadline(mut self, deadline: u64) -> Self {
        self.default_deadline = deadline;
        self
    }

    /// Instantiate one node per host spec. Duplicate names are fatal.
    pub fn create_cluster(&mut self, hosts: &[HostSpec]) -> ClusterResult<()> {
        info!(hosts = hosts.len(), "creating nodes");
        for host in hosts {
            let node = Node::from_host(host)?;
            self.add_node(node)?;
            info!(
                node = %host.name,
                device = %host.device,
                "node created"
            );
        }
        Ok(())
    }

    /// Add a prebuilt node. The cluster's runtime applies to it.
    pub fn add_node(&mut self, node: Node) -> ClusterResult<()> {
        if self.node_index.contains_key(node.name()) {
            return Err(ClusterError::DuplicateNode(node.name().to_string()));
        }
        let node = node.with_runtime_steps(self.runtime_steps);
        self.node_index.insert(node.name().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Admit new workloads to the pending queue. Each name gets the step
    /// appended (`<name>-<step>`); repeats within one batch get a further
    /// ordinal (`<name>-<step>-1`, ...).
    pub fn create_new_workloads(&mut self, specs: &[WorkloadSpec], step: u64) -> ClusterResult<()> {
        for spec in specs {
            let name = self.unique_name(&format!("{}-{}", spec.name, step));
            let workload = Workload::from_spec(spec, name, self.default_deadline)?;
            debug!(
                workload = %workload.name(),
                cpu = %format_cpu(workload.request_cpu()),
                memory = %format_memory(workload.request_memory()),
                "workload created"
            );
            self.pending.push(workload);
        }
        self.workloads_total += specs.len() as u64;
        Ok(())
    }

    /// Queue a prebuilt pending workload under its own name.
    pub fn submit(&mut self, workload: Workload) -> ClusterResult<()> {
        if self.name_in_use(workload.name()) {
            return Err(ClusterError::DuplicateWorkload(workload.name().to_string()));
        }
        self.pending.push(workload);
        self.workloads_total += 1;
        Ok(())
    }

    /// Advance to `step` and update every node.
    pub fn update(&mut self, step: u64) -> ClusterResult<Vec<Workload>> {
        self.current_step = step;
        let mut finished = Vec::new();
        for node in &mut self.nodes {
            for pod in node.update(step)? {
                info!(workload = %pod.name(), node = %node.name(), step, "workload finished");
                finished.push(pod);
            }
        }
        Ok(finished)
    }

    /// Apply one scheduler decision.
    ///
    /// Unknown workload or node names mean the scheduler produced an
    /// invalid decision and are returned as errors. A workload that no
    /// longer fits is left pending.
    pub fn placement(
        &mut self,
        workload_name: &str,
        node_name: &str,
        step: u64,
    ) -> ClusterResult<PlacementOutcome> {
        let position = self
            .pending
            .iter()
            .position(|w| w.name() == workload_name)
            .ok_or_else(|| ClusterError::UnknownWorkload(workload_name.to_string()))?;
        let index = *self
            .node_index
            .get(node_name)
            .ok_or_else(|| ClusterError::UnknownNode(node_name.to_string()))?;

        let node = &mut self.nodes[index];
        if !node.is_workload_fit(&self.pending[position]) {
            warn!(
                workload = workload_name,
                node = node_name,
                step,
                "decision rejected, workload does not fit"
            );
            return Ok(PlacementOutcome::Rejected);
        }

        let workload = self.pending.remove(position);
        let (cpu, memory) = (workload.request_cpu(), workload.request_memory());
        node.place_pod(workload, step)?;
        info!(
            workload = workload_name,
            node = node_name,
            step,
            cpu = %format_cpu(cpu),
            memory = %format_memory(memory),
            "workload placed"
        );
        Ok(PlacementOutcome::Placed)
    }

    /// Release all node and workload state.
    pub fn cleanup(&mut self) {
        for node in &mut self.nodes {
            node.clear();
        }
        self.pending.clear();
        debug!("cluster state released");
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.node_index.get(name).map(|i| &self.nodes[*i])
    }

    pub fn pending(&self) -> &[Workload] {
        &self.pending
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Workloads admitted since the cluster was created.
    pub fn workloads_total(&self) -> u64 {
        self.workloads_total
    }

    pub fn runtime_steps(&self) -> u64 {
        self.runtime_steps
    }

    fn name_in_use(&self, name: &str) -> bool {
        self.pending.iter().any(|w| w.name() == name)
            || self.nodes.iter().any(|n| n.pod(name).is_some())
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.name_in_use(base) {
            return base.to_string();
        }
        (1..)
            .map(|ordinal| format!("{base}-{ordinal}"))
            .find(|candidate| !self.name_in_use(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

impl ClusterBackend for Cluster {
    fn create_cluster(&mut self, hosts: &[HostSpec]) -> ClusterResult<()> {
        Cluster::create_cluster(self, hosts)
    }

    fn create_new_workloads(&mut self, specs: &[WorkloadSpec], step: u64) -> ClusterResult<()> {
        Cluster::create_new_workloads(self, specs, step)
    }

    fn update(&mut self, step: u64) -> ClusterResult<Vec<Workload>> {
        Cluster::update(self, step)
    }

    fn placement(&mut self, workload: &str, node: &str, step: u64) -> ClusterResult<PlacementOutcome> {
        Cluster::placement(self, workload, node, step)
    }

    fn cleanup(&mut self) -> ClusterResult<()> {
        Cluster::cleanup(self);
        Ok(())
    }

    fn state(&self) -> &Cluster {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkloadState;

    fn hosts() -> Vec<HostSpec> {
        vec![
            HostSpec::new("a", "xaviernx").with_capacity("3000m", "4Gi"),
            HostSpec::new("b", "rpi").with_capacity("1000m", "1Gi"),
        ]
    }

    fn cluster() -> Cluster {
        let mut c = Cluster::new();
        c.create_cluster(&hosts()).unwrap();
        c
    }

    #[test]
    fn nodes_keep_host_order() {
        let c = cluster();
        let names: Vec<&str> = c.nodes().iter().map(Node::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(c.node("b").unwrap().capacity_cpu(), 1_000);
    }

    #[test]
    fn duplicate_host_is_fatal() {
        let mut c = Cluster::new();
        let dup = vec![HostSpec::new("a", "rpi"), HostSpec::new("a", "rpi")];
        assert!(matches!(
            c.create_cluster(&dup),
            Err(ClusterError::DuplicateNode(name)) if name == "a"
        ));
    }

    #[test]
    fn new_workloads_get_step_suffix() {
        let mut c = cluster();
        let specs = vec![
            WorkloadSpec::new("motion", "1000m", "1Gi"),
            WorkloadSpec::new("sound", "1000m", "200Mi"),
        ];
        c.create_new_workloads(&specs, 4).unwrap();
        c.create_new_workloads(&specs[..1], 5).unwrap();

        let names: Vec<&str> = c.pending().iter().map(Workload::name).collect();
        assert_eq!(names, vec!["motion-4", "sound-4", "motion-5"]);
        assert_eq!(c.workloads_total(), 3);
    }

    #[test]
    fn repeated_template_in_one_batch_is_disambiguated() {
        let mut c = cluster();
        let spec = WorkloadSpec::new("probe", "10m", "1Mi");
        c.create_new_workloads(&[spec.clone(), spec], 0).unwrap();

        let names: Vec<&str> = c.pending().iter().map(Workload::name).collect();
        assert_eq!(names, vec!["probe-0", "probe-0-1"]);
    }

    #[test]
    fn placement_moves_workload_from_pending_to_node() {
        let mut c = cluster();
        c.create_new_workloads(&[WorkloadSpec::new("w", "2000m", "3Gi")], 0).unwrap();

        let outcome = c.placement("w-0", "a", 0).unwrap();
        assert_eq!(outcome, PlacementOutcome::Placed);
        assert!(c.pending().is_empty());
        let pod = c.node("a").unwrap().pod("w-0").unwrap();
        assert_eq!(pod.state(), WorkloadState::Running);
        assert_eq!(pod.ended_step(), 3);
    }

    #[test]
    fn placement_of_unknown_names_is_an_invariant_violation() {
        let mut c = cluster();
        c.create_new_workloads(&[WorkloadSpec::new("w", "100m", "1Mi")], 0).unwrap();

        assert!(matches!(
            c.placement("ghost", "a", 0),
            Err(ClusterError::UnknownWorkload(_))
        ));
        assert!(matches!(
            c.placement("w-0", "z", 0),
            Err(ClusterError::UnknownNode(_))
        ));
        assert_eq!(c.pending().len(), 1);
    }

    #[test]
    fn non_fitting_decision_leaves_workload_pending() {
        let mut c = cluster();
        c.create_new_workloads(&[WorkloadSpec::new("w", "2000m", "3Gi")], 0).unwrap();

        assert_eq!(c.placement("w-0", "b", 0).unwrap(), PlacementOutcome::Rejected);
        assert_eq!(c.pending().len(), 1);
        assert_eq!(c.node("b").unwrap().running_count(), 0);
    }

    #[test]
    fn max_memory_request_is_rejected_next_to_a_running_pod() {
        let mut c = cluster();
        c.create_new_workloads(&[WorkloadSpec::new("small", "100m", "1Mi")], 0).unwrap();
        c.placement("small-0", "a", 0).unwrap();
        c.create_new_workloads(&[WorkloadSpec::new("huge", "100m", "18446744073709551615")], 0)
            .unwrap();

        assert_eq!(c.placement("huge-0", "a", 0).unwrap(), PlacementOutcome::Rejected);
        assert_eq!(c.node("a").unwrap().running_count(), 1);
        assert_eq!(c.pending().len(), 1);
    }

    #[test]
    fn update_advances_step_and_retires_workloads() {
        let mut c = Cluster::new().with_runtime_steps(2);
        c.create_cluster(&hosts()).unwrap();
        c.create_new_workloads(&[WorkloadSpec::new("w", "100m", "1Mi")], 1).unwrap();
        c.placement("w-1", "a", 1).unwrap();

        assert!(c.update(2).unwrap().is_empty());
        assert_eq!(c.current_step(), 2);

        let finished = c.update(3).unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name(), "w-1");
        assert_eq!(c.node("a").unwrap().metrics().finished_count, 1);
    }

    #[test]
    fn workload_names_are_unique_across_pending_and_nodes() {
        let mut c = cluster();
        c.submit(Workload::new("w", 100, 1)).unwrap();
        c.placement("w", "a", 0).unwrap();
        assert!(matches!(
            c.submit(Workload::new("w", 100, 1)),
            Err(ClusterError::DuplicateWorkload(_))
        ));
    }

    #[test]
    fn cleanup_releases_state() {
        let mut c = cluster();
        c.create_new_workloads(&[WorkloadSpec::new("w", "100m", "1Mi")], 0).unwrap();
        c.create_new_workloads(&[WorkloadSpec::new("x", "100m", "1Mi")], 0).unwrap();
        c.placement("w-0", "a", 0).unwrap();

        ClusterBackend::cleanup(&mut c).unwrap();
        assert!(c.pending().is_empty());
        assert!(c.nodes().iter().all(|n| n.running_count() == 0));
        assert_eq!(c.nodes().len(), 2);
    }
}
