//! The simulation loop.
//!
//! ```text
//! for step in 0..steps:
//!   loader.next()                 → new workload specs
//!   cluster.create_new_workloads  → pending queue
//!   cluster.update(step)          → node metrics, finished workloads
//!   scheduler.step(pending)       → ordered decisions
//!   cluster.placement(...)        → applied in order
//!   aggregate + scheduler scores  → sink.log_metrics
//! cluster.cleanup(); sink.finish()
//! ```
//!
//! Cleanup and finish run whether or not the loop failed.

use std::time::Duration;

use edgesim_cluster::{Cluster, ClusterBackend, PlacementOutcome};
use edgesim_core::SimConfig;
use edgesim_metrics::{MetricsSink, SCORE_PREFIX, aggregate, build_sink};
use edgesim_placement::{PolicyContext, Scheduler, build_scheduler};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SimResult;
use crate::loader::{DataLoader, build_loader};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub device: String,
    pub running_workloads: usize,
    pub finished_workloads: u64,
    pub energy_consumed: f64,
}

/// What a run produced, captured before the cluster is cleaned up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub scheduler: String,
    pub dataloader: String,
    pub visualization: String,
    pub steps: u64,
    pub workloads_total: u64,
    pub workloads_pending: usize,
    pub workloads_finished: u64,
    pub decisions_applied: u64,
    pub decisions_rejected: u64,
    pub energy_consumed: f64,
    pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Default)]
struct Counters {
    applied: u64,
    rejected: u64,
}

pub struct Runner {
    config: SimConfig,
    cluster: Box<dyn ClusterBackend>,
    scheduler: Box<dyn Scheduler>,
    loader: Box<dyn DataLoader>,
    sink: Box<dyn MetricsSink>,
    counters: Counters,
}

impl Runner {
    /// Validate the config, resolve every registry name, and build the
    /// cluster. All configuration errors surface here, before any tick.
    pub fn from_config(config: SimConfig) -> SimResult<Self> {
        config.validate()?;

        let ctx = PolicyContext {
            seed: config.seed,
            solver: config.solver.clone(),
        };
        let scheduler = build_scheduler(&config.scheduler, &ctx)?;
        let loader = build_loader(&config)?;
        let sink = build_sink(&config.visualization, config.output_dir.as_deref())?;
        info!(
            scheduler = %config.scheduler,
            dataloader = %config.dataloader,
            visualization = %config.visualization,
            "components loaded"
        );

        let mut cluster = Cluster::new()
            .with_runtime_steps(config.workload_runtime_steps)
            .with_default_deadline(config.default_deadline);
        cluster.create_cluster(&config.hosts)?;

        Ok(Self::new(config, Box::new(cluster), scheduler, loader, sink))
    }

    /// Assemble a runner from prebuilt parts. The cluster must already
    /// hold its nodes.
    pub fn new(
        config: SimConfig,
        cluster: Box<dyn ClusterBackend>,
        scheduler: Box<dyn Scheduler>,
        loader: Box<dyn DataLoader>,
        sink: Box<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            cluster,
            scheduler,
            loader,
            sink,
            counters: Counters::default(),
        }
    }

    /// Replace the configured sink.
    pub fn with_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn cluster(&self) -> &Cluster {
        self.cluster.state()
    }

    /// Run every configured step, then release the cluster and finish the
    /// sink. The first error wins.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        let result = self.run_steps();
        if let Err(err) = &result {
            warn!(error = %err, "simulation aborted");
        }

        let cleanup = self.cluster.cleanup();
        let finish = self.sink.finish();

        let summary = result?;
        cleanup?;
        finish?;
        Ok(summary)
    }

    fn run_steps(&mut self) -> SimResult<RunSummary> {
        info!(steps = self.config.steps, hosts = self.cluster().nodes().len(), "simulation started");
        let delay = Duration::from_millis(self.config.step_delay_ms);
        self.counters = Counters::default();

        for step in 0..self.config.steps {
            self.step(step)?;
            if !delay.is_zero() && step + 1 < self.config.steps {
                std::thread::sleep(delay);
            }
        }

        let summary = self.summary();
        info!(
            total = summary.workloads_total,
            finished = summary.workloads_finished,
            pending = summary.workloads_pending,
            rejected = summary.decisions_rejected,
            energy = summary.energy_consumed,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Run a single tick. [`Runner::run`] calls this for every step; it is
    /// public so callers can inspect the cluster between ticks.
    pub fn step(&mut self, step: u64) -> SimResult<()> {
        let specs = self.loader.next()?;
        self.cluster.create_new_workloads(&specs, step)?;
        self.cluster.update(step)?;

        let state = self.cluster.state();
        let decisions = self.scheduler.step(state.pending(), state)?;
        for decision in &decisions {
            match self.cluster.placement(&decision.workload, &decision.node, step)? {
                PlacementOutcome::Placed => self.counters.applied += 1,
                PlacementOutcome::Rejected => self.counters.rejected += 1,
            }
        }

        let state = self.cluster.state();
        let mut frame = aggregate(state);
        for (key, value) in self.scheduler.evaluate(state) {
            frame.insert(format!("{SCORE_PREFIX}{key}"), value);
        }
        self.sink.log_metrics(&frame, step)?;

        debug!(
            step,
            created = specs.len(),
            decisions = decisions.len(),
            pending = state.pending().len(),
            "tick complete"
        );
        Ok(())
    }

    /// Totals so far. Call before [`Runner::run`] returns to see live state;
    /// after it returns the cluster has been cleaned up.
    pub fn summary(&self) -> RunSummary {
        let state = self.cluster();
        let nodes: Vec<NodeSummary> = state
            .nodes()
            .iter()
            .map(|n| NodeSummary {
                name: n.name().to_string(),
                device: n.device().to_string(),
                running_workloads: n.running_count(),
                finished_workloads: n.metrics().finished_count,
                energy_consumed: n.metrics().energy_consumed,
            })
            .collect();

        RunSummary {
            scheduler: self.scheduler.name().to_string(),
            dataloader: self.loader.name().to_string(),
            visualization: self.sink.name().to_string(),
            steps: self.config.steps,
            workloads_total: state.workloads_total(),
            workloads_pending: state.pending().len(),
            workloads_finished: nodes.iter().map(|n| n.finished_workloads).sum(),
            decisions_applied: self.counters.applied,
            decisions_rejected: self.counters.rejected,
            energy_consumed: nodes.iter().map(|n| n.energy_consumed).sum(),
            nodes,
        }
    }
}
