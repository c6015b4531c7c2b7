//! Workload model and lifecycle.

use edgesim_core::{GPU_CAPABILITY, Labels, WorkloadSpec, label_enabled, parse_cpu, parse_memory};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};

/// Lifecycle state of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadState {
    Pending,
    Running,
    Finished,
}

/// A schedulable unit of work.
///
/// Resource requests are fixed at construction; only the lifecycle fields
/// change afterwards, and only through the owning node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    name: String,
    labels: Labels,
    request_cpu: u64,
    request_memory: u64,
    state: WorkloadState,
    started_step: u64,
    ended_step: u64,
    deadline: u64,
}

impl Workload {
    /// A pending workload with explicit requests (millicores, bytes).
    pub fn new(name: &str, request_cpu: u64, request_memory: u64) -> Self {
        Self {
            name: name.to_string(),
            labels: Labels::new(),
            request_cpu,
            request_memory,
            state: WorkloadState::Pending,
            started_step: 0,
            ended_step: 0,
            deadline: 0,
        }
    }

    /// Build a pending workload from a loader spec under the given name.
    pub fn from_spec(spec: &WorkloadSpec, name: String, default_deadline: u64) -> ClusterResult<Self> {
        let request_cpu = parse_cpu(&spec.request_cpu).map_err(|source| ClusterError::Quantity {
            workload: name.clone(),
            field: "request_cpu",
            source,
        })?;
        let request_memory =
            parse_memory(&spec.request_memory).map_err(|source| ClusterError::Quantity {
                workload: name.clone(),
                field: "request_memory",
                source,
            })?;

        Ok(Self {
            labels: spec.labels.clone(),
            deadline: spec.deadline.unwrap_or(default_deadline),
            ..Self::new(&name, request_cpu, request_memory)
        })
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Requested CPU in millicores.
    pub fn request_cpu(&self) -> u64 {
        self.request_cpu
    }

    /// Requested memory in bytes.
    pub fn request_memory(&self) -> u64 {
        self.request_memory
    }

    pub fn state(&self) -> WorkloadState {
        self.state
    }

    pub fn started_step(&self) -> u64 {
        self.started_step
    }

    pub fn ended_step(&self) -> u64 {
        self.ended_step
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    /// Whether the workload asks for a GPU (`resource.gpu=true`).
    pub fn requires_gpu(&self) -> bool {
        label_enabled(&self.labels, GPU_CAPABILITY)
    }

    /// Whether a running workload is done at `step`.
    pub fn is_due(&self, step: u64) -> bool {
        self.state == WorkloadState::Running && self.ended_step <= step
    }

    pub(crate) fn start(&mut self, step: u64, runtime_steps: u64) -> ClusterResult<()> {
        self.transition(WorkloadState::Pending, WorkloadState::Running)?;
        self.started_step = step;
        self.ended_step = step.saturating_add(runtime_steps);
        Ok(())
    }

    pub(crate) fn finish(&mut self) -> ClusterResult<()> {
        self.transition(WorkloadState::Running, WorkloadState::Finished)
    }

    fn transition(&mut self, from: WorkloadState, to: WorkloadState) -> ClusterResult<()> {
        if self.state != from {
            return Err(ClusterError::Lifecycle {
                workload: self.name.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
