//! Cluster error types.

use edgesim_core::{ConfigError, QuantityError};
use thiserror::Error;

use crate::workload::WorkloadState;

pub type ClusterResult<T> = Result<T, ClusterError>;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown pending workload: {0}")]
    UnknownWorkload(String),

    #[error("workload name already in use: {0}")]
    DuplicateWorkload(String),

    #[error("host {host}: unknown device type {device:?}")]
    UnknownDevice { host: String, device: String },

    #[error("workload {workload} does not fit on node {node}")]
    InsufficientCapacity { workload: String, node: String },

    #[error("workload {workload}: illegal transition {from:?} -> {to:?}")]
    Lifecycle {
        workload: String,
        from: WorkloadState,
        to: WorkloadState,
    },

    #[error("workload {workload}: invalid {field}: {source}")]
    Quantity {
        workload: String,
        field: &'static str,
        #[source]
        source: QuantityError,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
