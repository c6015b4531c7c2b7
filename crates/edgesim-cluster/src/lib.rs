//! edgesim-cluster — the simulated edge fleet.
//!
//! Owns the state that scheduling policies reason about:
//!
//! ```text
//! Cluster
//!   ├── nodes (arena, host-spec order)
//!   │     └── Node ── active workloads, metrics, power history
//!   └── pending queue (arrival order)
//! ```
//!
//! Workloads move Pending → Running when a node accepts them and
//! Running → Finished when a node update passes their end step.

pub mod cluster;
pub mod device;
pub mod error;
pub mod node;
pub mod workload;

pub use cluster::{Cluster, ClusterBackend, PlacementOutcome};
pub use device::{DeviceProfile, PowerCurve};
pub use error::{ClusterError, ClusterResult};
pub use node::{Node, NodeMetrics, POWER_HISTORY_WINDOW};
pub use workload::{Workload, WorkloadState};
