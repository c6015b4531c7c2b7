//! edgesim-metrics — per-tick metrics and where they go.
//!
//! # Architecture
//!
//! ```text
//! Cluster ──aggregate()──► MetricFrame (BTreeMap<String, f64>)
//!                               │
//!                               ▼
//!                         dyn MetricsSink
//!                           ├── log        → tracing events
//!                           ├── jsonl      → <output_dir>/metrics.jsonl
//!                           ├── prometheus → <output_dir>/metrics.prom
//!                           ├── memory     → in-process recording (tests)
//!                           └── none
//! ```

pub mod collector;
pub mod error;
pub mod file;
pub mod prometheus;
pub mod registry;
pub mod sink;

pub use collector::{
    CLUSTER_PENDING, CLUSTER_TOTAL, MetricFrame, NODE_METRICS, SCORE_PREFIX, aggregate, node_key, split_node_key,
};
pub use error::{SinkError, SinkResult};
pub use file::{JsonLinesSink, PrometheusSink};
pub use prometheus::render_prometheus;
pub use registry::{SINK_NAMES, build_sink};
pub use sink::{MemorySink, MetricsSink, NullSink, TracingSink};
