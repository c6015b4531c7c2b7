//! edgesim — discrete-time simulator for scheduling workloads on a fleet
//! of edge devices.
//!
//! # Architecture
//!
//! ```text
//! SimConfig (TOML)
//!   │
//!   ▼
//! Runner ─┬─ DataLoader         simple | job | trace
//!         ├─ ClusterBackend     in-memory Cluster (edgesim-cluster)
//!         ├─ Scheduler          random | edf | fairshare | waggle | dual-descent
//!         └─ MetricsSink        log | jsonl | prometheus | none
//! ```
//!
//! Every component is picked by name when the runner is built, so a bad
//! name fails before the first tick.

pub mod error;
pub mod loader;
pub mod runner;

pub use error::{SimError, SimResult};
pub use loader::{DataLoader, JobLoader, LOADER_NAMES, SimpleLoader, TraceLoader, build_loader};
pub use runner::{NodeSummary, RunSummary, Runner};
