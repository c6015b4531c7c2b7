//! Visualization sinks.
//!
//! A sink receives one [`MetricFrame`] per tick and is finished exactly
//! once when the run ends, whether or not the run succeeded.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::collector::{CLUSTER_PENDING, CLUSTER_TOTAL, MetricFrame};
use crate::error::SinkResult;

pub trait MetricsSink {
    fn name(&self) -> &str;

    fn log_metrics(&mut self, metrics: &MetricFrame, step: u64) -> SinkResult<()>;

    /// Flush and release resources.
    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// Emits frames through `tracing`: a one-line summary at info, every
/// metric at debug.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn name(&self) -> &str {
        "log"
    }

    fn log_metrics(&mut self, metrics: &MetricFrame, step: u64) -> SinkResult<()> {
        for (metric, value) in metrics {
            debug!(step, metric = %metric, value, "metric");
        }
        info!(
            step,
            pending = metrics.get(CLUSTER_PENDING).copied().unwrap_or_default(),
            total = metrics.get(CLUSTER_TOTAL).copied().unwrap_or_default(),
            series = metrics.len(),
            "metrics published"
        );
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    fn log_metrics(&mut self, _metrics: &MetricFrame, _step: u64) -> SinkResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    frames: Vec<(u64, MetricFrame)>,
    finished: bool,
}

/// Keeps every frame in memory. Clones share the same recording, so a
/// caller can hand one clone to a runner and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    recorded: Rc<RefCell<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<(u64, MetricFrame)> {
        self.recorded.borrow().frames.clone()
    }

    pub fn last(&self) -> Option<MetricFrame> {
        self.recorded.borrow().frames.last().map(|(_, f)| f.clone())
    }

    pub fn is_finished(&self) -> bool {
        self.recorded.borrow().finished
    }
}

impl MetricsSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn log_metrics(&mut self, metrics: &MetricFrame, step: u64) -> SinkResult<()> {
        self.recorded.borrow_mut().frames.push((step, metrics.clone()));
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        self.recorded.borrow_mut().finished = true;
        Ok(())
    }
}
