//! File-backed sinks.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::collector::MetricFrame;
use crate::error::{SinkError, SinkResult};
use crate::prometheus::render_prometheus;
use crate::sink::MetricsSink;

pub const JSONL_FILE: &str = "metrics.jsonl";
pub const PROMETHEUS_FILE: &str = "metrics.prom";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Serialize)]
struct Line<'a> {
    step: u64,
    metrics: &'a MetricFrame,
}

/// Appends one JSON object per tick to `<dir>/metrics.jsonl`:
///
/// ```text
/// {"step":0,"metrics":{"cluster_pending_workloads":1.0,...}}
/// ```
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    pub fn create(dir: &Path) -> SinkResult<Self> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        let path = dir.join(JSONL_FILE);
        let file = File::create(&path).map_err(io_error(&path))?;
        info!(path = %path.display(), "writing metrics as JSON lines");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn log_metrics(&mut self, metrics: &MetricFrame, step: u64) -> SinkResult<()> {
        serde_json::to_writer(&mut self.writer, &Line { step, metrics })?;
        self.writer.write_all(b"\n").map_err(io_error(&self.path))
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.writer.flush().map_err(io_error(&self.path))?;
        debug!(path = %self.path.display(), "metrics file closed");
        Ok(())
    }
}

/// Rewrites `<dir>/metrics.prom` with the latest frame every tick. The
/// file is replaced atomically so a scraper never sees a partial write.
#[derive(Debug, Default)]
pub struct PrometheusSink {
    path: Option<PathBuf>,
    last: String,
}

impl PrometheusSink {
    /// Keep the rendering in memory only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(dir: &Path) -> SinkResult<Self> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        Ok(Self {
            path: Some(dir.join(PROMETHEUS_FILE)),
            last: String::new(),
        })
    }

    /// The most recent rendering.
    pub fn rendered(&self) -> &str {
        &self.last
    }
}

impl MetricsSink for PrometheusSink {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn log_metrics(&mut self, metrics: &MetricFrame, step: u64) -> SinkResult<()> {
        self.last = render_prometheus(metrics, step);
        if let Some(path) = &self.path {
            let staging = path.with_extension("prom.tmp");
            fs::write(&staging, &self.last).map_err(io_error(&staging))?;
            fs::rename(&staging, path).map_err(io_error(path))?;
        }
        Ok(())
    }
}
