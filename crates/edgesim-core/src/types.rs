//! Shared types used across edgesim crates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form string labels attached to hosts and workloads.
pub type Labels = BTreeMap<String, String>;

/// Namespace prefix for node capability labels (`waggle.io/resource.gpu`).
pub const CAPABILITY_PREFIX: &str = "waggle.io";

/// Capability name for GPU access, both as a workload requirement
/// (`resource.gpu`) and, prefixed, as a node capability.
pub const GPU_CAPABILITY: &str = "resource.gpu";

/// Whether a label value switches a capability on.
pub fn label_enabled(labels: &Labels, key: &str) -> bool {
    labels
        .get(key)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// A workload as produced by a data loader, before it is admitted to the
/// pending queue. Quantities are still in human-readable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub name: String,
    #[serde(default = "default_request_cpu")]
    pub request_cpu: String,
    #[serde(default = "default_request_memory")]
    pub request_memory: String,
    #[serde(default)]
    pub labels: Labels,
    /// Deadline as a step offset; the simulation default applies when absent.
    #[serde(default)]
    pub deadline: Option<u64>,
}

fn default_request_cpu() -> String {
    "100m".to_string()
}

fn default_request_memory() -> String {
    "1Mi".to_string()
}

impl WorkloadSpec {
    pub fn new(name: &str, request_cpu: &str, request_memory: &str) -> Self {
        Self {
            name: name.to_string(),
            request_cpu: request_cpu.to_string(),
            request_memory: request_memory.to_string(),
            labels: Labels::new(),
            deadline: None,
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
