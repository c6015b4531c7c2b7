//! Uniform random placement.

use edgesim_cluster::{Cluster, Workload};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PlacementResult;
use crate::scheduler::{Decision, Scheduler};

/// Sends every pending workload to a uniformly chosen node without a fit
/// check. Decisions that do not fit are rejected by the cluster when applied.
#[derive(Debug, Clone)]
pub struct RandomScheduler {
    rng: StdRng,
}

impl RandomScheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Scheduler for RandomScheduler {
    fn name(&self) -> &str {
        "random"
    }

    fn step(&mut self, pending: &[Workload], cluster: &Cluster) -> PlacementResult<Vec<Decision>> {
        let nodes = cluster.nodes();
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(pending
            .iter()
            .map(|w| Decision::new(w, &nodes[self.rng.gen_range(0..nodes.len())]))
            .collect())
    }
}
