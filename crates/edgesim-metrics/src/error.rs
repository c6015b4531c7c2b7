//! Sink error types.

use std::path::PathBuf;

use thiserror::Error;

pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unknown visualization sink: {0}")]
    UnknownSink(String),

    #[error("sink {0} writes files but no output_dir is configured")]
    MissingOutputDir(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode metrics: {0}")]
    Json(#[from] serde_json::Error),
}
