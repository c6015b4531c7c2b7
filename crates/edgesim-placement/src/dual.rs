//! Dual-descent placement.
//!
//! Each tick the nodes negotiate how much of the pending CPU demand each
//! of them absorbs:
//!
//! ```text
//! node i:   maximize −½(x_i − free_i)²   s.t. 0 ≤ x_i ≤ free_i     (cores)
//! coupling: Σ x_i ≤ demand
//! ```
//!
//! The solved `x_i` become per-node quotas. Workloads are then handed out
//! in arrival order to the fitting node with the most quota left.

use std::collections::BTreeMap;

use edgesim_cluster::{Cluster, Workload};
use edgesim_core::SolverConfig;
use edgesim_solver::{Coupling, DualDescentOutcome, DualDescentSolver, LocalProblem, QuadraticProblem};
use tracing::{debug, warn};

use crate::error::PlacementResult;
use crate::scheduler::{Decision, Scheduler, VirtualCluster};

const MILLICORES_PER_CORE: f64 = 1_000.0;

pub struct DualDescentScheduler {
    config: SolverConfig,
    last: Option<DualDescentOutcome>,
}

impl DualDescentScheduler {
    pub fn new(config: SolverConfig) -> Self {
        Self { config, last: None }
    }

    /// Outcome of the most recent solve.
    pub fn last_outcome(&self) -> Option<&DualDescentOutcome> {
        self.last.as_ref()
    }

    /// Solve for per-node CPU quotas, in millicores.
    fn quotas(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<f64>> {
        let nodes = cluster.nodes();
        let free: Vec<f64> = nodes
            .iter()
            .map(|n| n.capacity_cpu().saturating_sub(n.cpu_in_use()) as f64 / MILLICORES_PER_CORE)
            .collect();
        let demand = pending.iter().map(|w| w.request_cpu() as f64).sum::<f64>() / MILLICORES_PER_CORE;

        let problems = free
            .iter()
            .enumerate()
            .map(|(i, f)| {
                QuadraticProblem::tracking(i, vec![*f], vec![0.0], vec![*f])
                    .map(|p| Box::new(p) as Box<dyn LocalProblem>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let coupling = Coupling::new(vec![vec![1.0; nodes.len()]], vec![demand])?;

        let step_size = if self.config.step_size > 0.0 {
            self.config.step_size
        } else {
            1.0 / nodes.len() as f64
        };
        let solver = DualDescentSolver::new(self.config.tolerance, self.config.max_iters, step_size)?;
        let outcome = solver.solve(&problems, &coupling)?;

        if outcome.converged {
            debug!(
                iterations = outcome.iterations,
                demand,
                multiplier = outcome.multipliers[0],
                "quotas solved"
            );
        } else {
            warn!(
                iterations = outcome.iterations,
                step = cluster.current_step(),
                "dual descent did not converge, using last iterate"
            );
        }

        let quotas = outcome.x.iter().map(|x| x * MILLICORES_PER_CORE).collect();
        self.last = Some(outcome);
        Ok(quotas)
    }
}

impl Scheduler for DualDescentScheduler {
    fn name(&self) -> &str {
        "dual-descent"
    }

    fn step(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<Decision>> {
        if pending.is_empty() || cluster.nodes().is_empty() {
            return Ok(Vec::new());
        }
        let mut quotas = self.quotas(pending, cluster)?;

        let mut view = VirtualCluster::snapshot(cluster);
        let mut decisions = Vec::new();
        for workload in pending {
            let mut choice: Option<usize> = None;
            for (index, node) in view.nodes().iter().enumerate() {
                if !node.is_workload_fit(workload) {
                    continue;
                }
                if choice.is_none_or(|best| quotas[index] > quotas[best]) {
                    choice = Some(index);
                }
            }
            match choice {
                Some(index) => {
                    quotas[index] -= workload.request_cpu() as f64;
                    decisions.push(view.place(index, workload)?);
                }
                None => debug!(workload = %workload.name(), "no node fits, deferring"),
            }
        }
        Ok(decisions)
    }

    fn evaluate(&self, _cluster: &Cluster) -> BTreeMap<String, f64> {
        let Some(outcome) = &self.last else {
            return BTreeMap::new();
        };
        BTreeMap::from([
            ("iterations".to_string(), outcome.iterations as f64),
            ("converged".to_string(), if outcome.converged { 1.0 } else { 0.0 }),
            ("multiplier".to_string(), outcome.multipliers[0]),
            ("allocated_cores".to_string(), outcome.x.iter().sum()),
        ])
    }
}
