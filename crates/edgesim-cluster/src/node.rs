//! Node device model.
//!
//! A node owns the workloads running on it, checks whether another
//! workload fits, and keeps utilization, power and energy metrics:
//!
//! - usage (`cpu_used`, `memory_used`) is the sum of active requests
//! - power is read off the device's [`PowerCurve`] at the rounded CPU
//!   utilization percentage
//! - once per tick ([`Node::update`]) the power reading is sampled into a
//!   3-entry history for the moving average and integrated into energy

use std::collections::{BTreeMap, VecDeque};

use edgesim_core::{CAPABILITY_PREFIX, GPU_CAPABILITY, HostSpec, Labels, label_enabled};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::{DeviceProfile, PowerCurve};
use crate::error::{ClusterError, ClusterResult};
use crate::workload::Workload;

/// Number of power samples in the moving-average window.
pub const POWER_HISTORY_WINDOW: usize = 3;

/// Simulated duration of one tick, in the unit energy is reported in.
const STEP_DURATION: f64 = 1.0;

/// Default workload runtime in steps.
const DEFAULT_RUNTIME_STEPS: u64 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Millicores requested by active workloads.
    pub cpu_used: u64,
    /// Bytes requested by active workloads.
    pub memory_used: u64,
    pub power_watts: f64,
    pub power_moving_average: f64,
    pub energy_consumed: f64,
    pub finished_count: u64,
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    device: String,
    labels: Labels,
    capacity_cpu: u64,
    capacity_memory: u64,
    power: PowerCurve,
    runtime_steps: u64,
    pods: BTreeMap<String, Workload>,
    metrics: NodeMetrics,
    power_history: VecDeque<f64>,
}

impl Node {
    pub fn new(name: &str, profile: &DeviceProfile, labels: Labels) -> Self {
        let mut node = Self {
            name: name.to_string(),
            device: profile.name.to_string(),
            labels,
            capacity_cpu: profile.cpu_millicores,
            capacity_memory: profile.memory_bytes,
            power: profile.power.clone(),
            runtime_steps: DEFAULT_RUNTIME_STEPS,
            pods: BTreeMap::new(),
            metrics: NodeMetrics::default(),
            power_history: VecDeque::with_capacity(POWER_HISTORY_WINDOW + 1),
        };
        node.calculate_resource_usage();
        node
    }

    /// Build a node from a host spec, applying any capacity override.
    pub fn from_host(host: &HostSpec) -> ClusterResult<Self> {
        let profile = DeviceProfile::lookup(&host.device).ok_or_else(|| ClusterError::UnknownDevice {
            host: host.name.clone(),
            device: host.device.clone(),
        })?;

        let mut node = Self::new(&host.name, &profile, host.labels.clone());
        if let Some(cpu) = host.cpu_millicores()? {
            node.capacity_cpu = cpu;
        }
        if let Some(memory) = host.memory_bytes()? {
            node.capacity_memory = memory;
        }
        node.calculate_resource_usage();
        Ok(node)
    }

    /// Set how many steps an accepted workload runs for.
    pub fn with_runtime_steps(mut self, runtime_steps: u64) -> Self {
        self.runtime_steps = runtime_steps;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// CPU capacity in millicores.
    pub fn capacity_cpu(&self) -> u64 {
        self.capacity_cpu
    }

    /// Memory capacity in bytes.
    pub fn capacity_memory(&self) -> u64 {
        self.capacity_memory
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn pods(&self) -> impl Iterator<Item = &Workload> {
        self.pods.values()
    }

    pub fn pod(&self, name: &str) -> Option<&Workload> {
        self.pods.get(name)
    }

    pub fn running_count(&self) -> usize {
        self.pods.len()
    }

    /// Millicores requested by the active workloads.
    pub fn cpu_in_use(&self) -> u64 {
        self.pods.values().map(Workload::request_cpu).sum()
    }

    /// Bytes requested by the active workloads.
    pub fn memory_in_use(&self) -> u64 {
        self.pods.values().map(Workload::request_memory).sum()
    }

    /// Strict fit check: saturating a node exactly counts as not fitting.
    /// A request so large the total overflows never fits.
    pub fn is_workload_fit(&self, workload: &Workload) -> bool {
        let fits = |in_use: u64, request: u64, capacity: u64| {
            in_use.checked_add(request).is_some_and(|total| total < capacity)
        };
        fits(self.cpu_in_use(), workload.request_cpu(), self.capacity_cpu)
            && fits(self.memory_in_use(), workload.request_memory(), self.capacity_memory)
    }

    /// CPU utilization ratio used to rank nodes by load (lower = idler).
    pub fn resource_score(&self) -> f64 {
        if self.capacity_cpu == 0 {
            return 1.0;
        }
        self.cpu_in_use() as f64 / self.capacity_cpu as f64
    }

    /// Label value under the capability namespace (`waggle.io/<name>`).
    pub fn get_label(&self, name: &str) -> Option<&str> {
        self.labels
            .get(&format!("{CAPABILITY_PREFIX}/{name}"))
            .map(String::as_str)
    }

    pub fn has_capability(&self, name: &str) -> bool {
        label_enabled(&self.labels, &format!("{CAPABILITY_PREFIX}/{name}"))
    }

    pub fn has_gpu(&self) -> bool {
        self.has_capability(GPU_CAPABILITY)
    }

    /// Active workloads that requested a GPU.
    pub fn gpu_workload_count(&self) -> usize {
        self.pods.values().filter(|p| p.requires_gpu()).count()
    }

    pub fn estimate_power_watts(&self, utilization_percent: f64) -> f64 {
        self.power.estimate(utilization_percent)
    }

    /// Accept a workload at `step`. The workload runs for the node's
    /// configured runtime and counts against capacity immediately.
    pub fn place_pod(&mut self, mut workload: Workload, step: u64) -> ClusterResult<()> {
        if !self.is_workload_fit(&workload) {
            return Err(ClusterError::InsufficientCapacity {
                workload: workload.name().to_string(),
                node: self.name.clone(),
            });
        }
        if self.pods.contains_key(workload.name()) {
            return Err(ClusterError::DuplicateWorkload(workload.name().to_string()));
        }

        workload.start(step, self.runtime_steps)?;
        debug!(
            node = %self.name,
            workload = %workload.name(),
            ends = workload.ended_step(),
            "workload started"
        );
        self.pods.insert(workload.name().to_string(), workload);
        self.calculate_resource_usage();
        Ok(())
    }

    /// Advance the node to `step`: sample power for the tick, then retire
    /// every workload whose end step has been reached. Returns the retired
    /// workloads in the `Finished` state.
    pub fn update(&mut self, step: u64) -> ClusterResult<Vec<Workload>> {
        self.calculate_resource_usage();
        self.record_power_sample();

        let due: Vec<String> = self
            .pods
            .values()
            .filter(|p| p.is_due(step))
            .map(|p| p.name().to_string())
            .collect();

        let mut finished = Vec::with_capacity(due.len());
        for name in due {
            if let Some(mut pod) = self.pods.remove(&name) {
                pod.finish()?;
                self.metrics.finished_count += 1;
                finished.push(pod);
            }
        }
        Ok(finished)
    }

    /// Drop every active workload and reset metrics.
    pub fn clear(&mut self) {
        self.pods.clear();
        self.power_history.clear();
        self.metrics = NodeMetrics::default();
        self.calculate_resource_usage();
    }

    fn utilization_percent(&self) -> f64 {
        if self.capacity_cpu == 0 {
            return 100.0;
        }
        (self.metrics.cpu_used as f64 / self.capacity_cpu as f64 * 100.0).round()
    }

    fn calculate_resource_usage(&mut self) {
        self.metrics.cpu_used = self.cpu_in_use();
        self.metrics.memory_used = self.memory_in_use();
        self.metrics.power_watts = self.estimate_power_watts(self.utilization_percent());
    }

    fn record_power_sample(&mut self) {
        self.power_history.push_back(self.metrics.power_watts);
        while self.power_history.len() > POWER_HISTORY_WINDOW {
            self.power_history.pop_front();
        }
        self.metrics.power_moving_average =
            self.power_history.iter().sum::<f64>() / self.power_history.len() as f64;
        self.metrics.energy_consumed += self.metrics.power_watts * STEP_DURATION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn make_node(name: &str, cpu: u64, memory: u64) -> Node {
        let profile = DeviceProfile {
            name: "test",
            cpu_millicores: cpu,
            memory_bytes: memory,
            power: PowerCurve::EDGE_DEFAULT,
        };
        Node::new(name, &profile, Labels::new())
    }

    #[test]
    fn fit_check_is_strict() {
        let mut node = make_node("n1", 1_000, 1_000);
        assert!(node.is_workload_fit(&Workload::new("a", 999, 999)));
        assert!(!node.is_workload_fit(&Workload::new("b", 1_000, 10)));
        assert!(!node.is_workload_fit(&Workload::new("c", 10, 1_000)));

        node.place_pod(Workload::new("d", 600, 100), 0).unwrap();
        assert!(node.is_workload_fit(&Workload::new("e", 399, 100)));
        assert!(!node.is_workload_fit(&Workload::new("f", 400, 100)));
    }

    #[test]
    fn oversized_request_never_fits_a_busy_node() {
        let mut node = make_node("n1", 6_000, 8 << 30);
        node.place_pod(Workload::new("small", 100, 1 << 20), 0).unwrap();

        let huge = Workload::new("huge", 100, u64::MAX);
        assert!(!node.is_workload_fit(&huge));
        assert!(matches!(
            node.place_pod(huge, 0),
            Err(ClusterError::InsufficientCapacity { .. })
        ));
        assert!(!node.is_workload_fit(&Workload::new("greedy", u64::MAX, 1)));
        assert_eq!(node.running_count(), 1);
    }

    #[test]
    fn place_pod_sets_lifecycle_and_usage() {
        let mut node = make_node("n1", 4_000, 4 << 30).with_runtime_steps(5);
        node.place_pod(Workload::new("w", 2_000, 1 << 30), 2).unwrap();

        let pod = node.pod("w").unwrap();
        assert_eq!(pod.started_step(), 2);
        assert_eq!(pod.ended_step(), 7);
        assert_eq!(node.metrics().cpu_used, 2_000);
        assert_eq!(node.metrics().memory_used, 1 << 30);
        assert_eq!(node.metrics().power_watts, 10.0);
        assert_eq!(node.resource_score(), 0.5);
    }

    #[test]
    fn place_pod_rejects_overcommit() {
        let mut node = make_node("n1", 1_000, 1_000);
        let err = node.place_pod(Workload::new("w", 1_000, 1), 0).unwrap_err();
        assert!(matches!(err, ClusterError::InsufficientCapacity { .. }));
        assert_eq!(node.running_count(), 0);
    }

    #[test]
    fn finish_happens_exactly_at_end_step() {
        let mut node = make_node("n1", 4_000, 4 << 30);
        node.place_pod(Workload::new("w", 1_000, 1 << 20), 0).unwrap();

        assert!(node.update(2).unwrap().is_empty());
        assert!(node.pod("w").is_some());
        assert_eq!(node.metrics().finished_count, 0);

        let finished = node.update(3).unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].state(), crate::WorkloadState::Finished);
        assert!(node.pod("w").is_none());
        assert_eq!(node.metrics().finished_count, 1);

        assert!(node.update(4).unwrap().is_empty());
        assert_eq!(node.metrics().finished_count, 1);
    }

    #[test]
    fn moving_average_uses_last_three_samples() {
        let mut node = make_node("n1", 10_000, 1 << 30).with_runtime_steps(100);

        node.update(0).unwrap();
        assert_eq!(node.metrics().power_moving_average, 5.0);

        node.place_pod(Workload::new("a", 5_000, 1), 0).unwrap();
        node.update(1).unwrap();
        assert_eq!(node.metrics().power_moving_average, 7.5);

        node.update(2).unwrap();
        node.update(3).unwrap();
        assert_eq!(node.metrics().power_moving_average, 10.0);
    }

    #[test]
    fn energy_accumulates_once_per_update() {
        let mut node = make_node("n1", 10_000, 1 << 30).with_runtime_steps(100);
        node.update(0).unwrap();
        node.place_pod(Workload::new("a", 2_000, 1), 0).unwrap();
        node.place_pod(Workload::new("b", 2_000, 1), 0).unwrap();
        assert_eq!(node.metrics().energy_consumed, 5.0);

        node.update(1).unwrap();
        assert_eq!(node.metrics().energy_consumed, 5.0 + 9.0);
    }

    #[test]
    fn zero_capacity_reads_as_saturated() {
        let node = make_node("n1", 0, 0);
        assert_eq!(node.resource_score(), 1.0);
        assert_eq!(node.metrics().power_watts, 15.0);
        assert!(!node.is_workload_fit(&Workload::new("w", 0, 0)));
    }

    #[test]
    fn capability_lookup_uses_namespace() {
        let profile = DeviceProfile::lookup("xaviernx").unwrap();
        let mut labels = Labels::new();
        labels.insert("waggle.io/resource.gpu".to_string(), "true".to_string());
        labels.insert("resource.camera".to_string(), "true".to_string());
        let node = Node::new("n1", &profile, labels);

        assert!(node.has_gpu());
        assert_eq!(node.get_label("resource.gpu"), Some("true"));
        assert!(!node.has_capability("resource.camera"));
    }

    #[test]
    fn from_host_applies_overrides() {
        let host = HostSpec::new("a", "rpi").with_capacity("3000m", "4Gi");
        let node = Node::from_host(&host).unwrap();
        assert_eq!(node.capacity_cpu(), 3_000);
        assert_eq!(node.capacity_memory(), 4 << 30);
        assert_eq!(node.device(), "rpi");

        let unknown = HostSpec::new("b", "mainframe");
        assert!(matches!(
            Node::from_host(&unknown),
            Err(ClusterError::UnknownDevice { .. })
        ));
    }

    #[test]
    fn randomized_placements_never_breach_capacity() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for round in 0..50 {
            let mut node = make_node("n1", rng.gen_range(500..8_000), rng.gen_range(1 << 20..1 << 32));
            for step in 0..40u64 {
                node.update(step).unwrap();
                for i in 0..rng.gen_range(0..5) {
                    let w = Workload::new(
                        &format!("w-{round}-{step}-{i}"),
                        rng.gen_range(0..3_000),
                        rng.gen_range(0..1 << 31),
                    );
                    let fits = node.is_workload_fit(&w);
                    let placed = node.place_pod(w, step).is_ok();
                    assert_eq!(fits, placed);
                    assert!(node.cpu_in_use() < node.capacity_cpu());
                    assert!(node.memory_in_use() < node.capacity_memory());
                }
            }
        }
    }
}
