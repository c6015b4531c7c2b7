//! Simulation error types.

use std::path::PathBuf;

use edgesim_cluster::ClusterError;
use edgesim_core::ConfigError;
use edgesim_metrics::SinkError;
use edgesim_placement::PlacementError;
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("unknown data loader: {0}")]
    UnknownLoader(String),

    #[error("the trace data loader needs trace_path")]
    MissingTracePath,

    #[error("failed to read trace {path}: {source}")]
    TraceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed trace {path}: {source}")]
    TraceFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("trace {0} holds no batches")]
    EmptyTrace(PathBuf),
}
