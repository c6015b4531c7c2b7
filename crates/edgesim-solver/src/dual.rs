//! Dual-descent coordination loop.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};
use crate::problem::LocalProblem;

/// Linear coupling constraint `G·x ≤ h` across all nodes' variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupling {
    matrix: Vec<Vec<f64>>,
    bound: Vec<f64>,
}

impl Coupling {
    pub fn new(matrix: Vec<Vec<f64>>, bound: Vec<f64>) -> SolverResult<Self> {
        let Some(width) = matrix.first().map(Vec::len) else {
            return Err(SolverError::Dimension("coupling matrix has no rows".into()));
        };
        if matrix.iter().any(|row| row.len() != width) {
            return Err(SolverError::Dimension("coupling matrix rows differ in width".into()));
        }
        if bound.len() != matrix.len() {
            return Err(SolverError::Dimension(format!(
                "{} coupling rows but {} bounds",
                matrix.len(),
                bound.len()
            )));
        }
        Ok(Self { matrix, bound })
    }

    /// `G·x ≤ 0`.
    pub fn homogeneous(matrix: Vec<Vec<f64>>) -> SolverResult<Self> {
        let rows = matrix.len();
        Self::new(matrix, vec![0.0; rows])
    }

    pub fn rows(&self) -> usize {
        self.matrix.len()
    }

    /// Length of the global variable vector.
    pub fn width(&self) -> usize {
        self.matrix[0].len()
    }

    /// `G·x − h`; positive entries are violated rows.
    pub fn residual(&self, x: &[f64]) -> Vec<f64> {
        self.matrix
            .iter()
            .zip(&self.bound)
            .map(|(row, h)| dot(row, x) - h)
            .collect()
    }

    /// `Gᵀ·λ`.
    fn weights(&self, multipliers: &[f64]) -> Vec<f64> {
        let mut weights = vec![0.0; self.width()];
        for (row, lambda) in self.matrix.iter().zip(multipliers) {
            for (w, g) in weights.iter_mut().zip(row) {
                *w += g * lambda;
            }
        }
        weights
    }
}

/// Result of a solve. A run that hit the iteration budget is still
/// returned, with `converged == false` and the last iterate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualDescentOutcome {
    pub x: Vec<f64>,
    pub multipliers: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Nodes whose subproblem failed in at least one round.
    pub failed_nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DualDescentSolver {
    tolerance: f64,
    max_iters: usize,
    step_size: f64,
    project: bool,
}

impl DualDescentSolver {
    pub fn new(tolerance: f64, max_iters: usize, step_size: f64) -> SolverResult<Self> {
        if !(tolerance > 0.0) {
            return Err(SolverError::Parameter("tolerance must be positive".into()));
        }
        if max_iters == 0 {
            return Err(SolverError::Parameter("max_iters must be at least 1".into()));
        }
        if !(step_size > 0.0) || !step_size.is_finite() {
            return Err(SolverError::Parameter("step size must be positive".into()));
        }
        Ok(Self {
            tolerance,
            max_iters,
            step_size,
            project: true,
        })
    }

    /// Keep multipliers non-positive (the default), which enforces the
    /// coupling as an inequality. Disabling it treats the rows as equalities.
    pub fn with_projection(mut self, project: bool) -> Self {
        self.project = project;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn solve(
        &self,
        problems: &[Box<dyn LocalProblem>],
        coupling: &Coupling,
    ) -> SolverResult<DualDescentOutcome> {
        let width = coupling.width();
        check_blocks(problems, width)?;

        let mut multipliers = vec![0.0; coupling.rows()];
        let mut current = vec![0.0; width];
        let mut previous: Option<Vec<f64>> = None;
        let mut failed = BTreeSet::new();

        for iteration in 1..=self.max_iters {
            // Primal: every node solves against the same shared snapshot.
            let weights = coupling.weights(&multipliers);
            let mut shared = current.clone();
            for (node, problem) in problems.iter().enumerate() {
                let range = problem.variables();
                match problem.solve(node, &weights, &current) {
                    Ok(block) if block.len() == range.len() => {
                        shared[range].copy_from_slice(&block);
                    }
                    Ok(block) => {
                        return Err(SolverError::Dimension(format!(
                            "node {node} returned {} values for block {range:?}",
                            block.len()
                        )));
                    }
                    Err(err) => {
                        warn!(node, iteration, error = %err, "local solve failed, keeping last allocation");
                        failed.insert(node);
                    }
                }
            }

            // Share.
            current = shared;

            // Dual.
            for (lambda, r) in multipliers.iter_mut().zip(coupling.residual(&current)) {
                *lambda -= self.step_size * r;
                if self.project {
                    *lambda = lambda.min(0.0);
                }
            }

            if let Some(prev) = &previous {
                let delta = distance(prev, &current);
                if delta < self.tolerance {
                    debug!(iteration, delta, "dual descent converged");
                    return Ok(DualDescentOutcome {
                        x: current,
                        multipliers,
                        iterations: iteration,
                        converged: true,
                        failed_nodes: failed.into_iter().collect(),
                    });
                }
            }
            previous = Some(current.clone());
        }

        debug!(iterations = self.max_iters, "dual descent hit the iteration budget");
        Ok(DualDescentOutcome {
            x: current,
            multipliers,
            iterations: self.max_iters,
            converged: false,
            failed_nodes: failed.into_iter().collect(),
        })
    }
}

/// Blocks must fit in the vector and must not overlap.
fn check_blocks(problems: &[Box<dyn LocalProblem>], width: usize) -> SolverResult<()> {
    let mut owned = vec![false; width];
    for (node, problem) in problems.iter().enumerate() {
        let range = problem.variables();
        if range.end > width {
            return Err(SolverError::Dimension(format!(
                "node {node} owns {range:?} but the coupling spans {width} variables"
            )));
        }
        for j in range {
            if std::mem::replace(&mut owned[j], true) {
                return Err(SolverError::Dimension(format!(
                    "variable {j} is owned by more than one node"
                )));
            }
        }
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use std::ops::Range;

    use super::*;
    use crate::problem::QuadraticProblem;

    fn tracking(offset: usize, target: f64) -> Box<dyn LocalProblem> {
        Box::new(
            QuadraticProblem::tracking(offset, vec![target], vec![f64::NEG_INFINITY], vec![f64::INFINITY])
                .unwrap(),
        )
    }

    /// maximize −½(x₀−3)² − ½(x₁−1)²  s.t.  x₀ − x₁ ≤ 0  →  x* = (2, 2)
    fn two_node_problem() -> (Vec<Box<dyn LocalProblem>>, Coupling) {
        let problems = vec![tracking(0, 3.0), tracking(1, 1.0)];
        let coupling = Coupling::homogeneous(vec![vec![1.0, -1.0]]).unwrap();
        (problems, coupling)
    }

    #[test]
    fn converges_to_closed_form_optimum() {
        let (problems, coupling) = two_node_problem();
        let solver = DualDescentSolver::new(1e-6, 100, 0.25).unwrap();

        let outcome = solver.solve(&problems, &coupling).unwrap();

        assert!(outcome.converged);
        assert!(outcome.iterations < 100);
        assert!((outcome.x[0] - 2.0).abs() < 1e-4, "x0 = {}", outcome.x[0]);
        assert!((outcome.x[1] - 2.0).abs() < 1e-4, "x1 = {}", outcome.x[1]);
        assert!((outcome.multipliers[0] + 1.0).abs() < 1e-4);
        assert!(outcome.failed_nodes.is_empty());
    }

    #[test]
    fn inactive_coupling_leaves_local_optima() {
        let problems = vec![tracking(0, 1.0), tracking(1, 3.0)];
        let coupling = Coupling::homogeneous(vec![vec![1.0, -1.0]]).unwrap();
        let solver = DualDescentSolver::new(1e-6, 100, 0.25).unwrap();

        let outcome = solver.solve(&problems, &coupling).unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.x, vec![1.0, 3.0]);
        assert_eq!(outcome.multipliers, vec![0.0]);
    }

    #[test]
    fn unprojected_multipliers_enforce_equality() {
        // maximize −½(x₀−1)² − ½(x₁−3)²  s.t.  x₀ − x₁ = 0  →  x* = (2, 2), λ = 1
        let problems = vec![tracking(0, 1.0), tracking(1, 3.0)];
        let coupling = Coupling::homogeneous(vec![vec![1.0, -1.0]]).unwrap();
        let solver = DualDescentSolver::new(1e-6, 100, 0.25).unwrap().with_projection(false);

        let outcome = solver.solve(&problems, &coupling).unwrap();
        assert!(outcome.converged);
        assert!((outcome.x[0] - 2.0).abs() < 1e-4, "x0 = {}", outcome.x[0]);
        assert!((outcome.x[1] - 2.0).abs() < 1e-4, "x1 = {}", outcome.x[1]);
        assert!((outcome.multipliers[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn oversized_step_reports_non_convergence_with_last_iterate() {
        let (problems, coupling) = two_node_problem();
        let solver = DualDescentSolver::new(1e-6, 20, 1.0).unwrap();

        let outcome = solver.solve(&problems, &coupling).unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 20);
        assert_eq!(outcome.x.len(), 2);
    }

    #[test]
    fn infeasible_node_keeps_last_valid_block() {
        let bad: Box<dyn LocalProblem> =
            Box::new(QuadraticProblem::tracking(0, vec![1.0], vec![2.0], vec![1.0]).unwrap());
        let problems = vec![bad, tracking(1, 1.0)];
        let coupling = Coupling::new(vec![vec![1.0, 1.0]], vec![10.0]).unwrap();
        let solver = DualDescentSolver::new(1e-6, 50, 0.25).unwrap();

        let outcome = solver.solve(&problems, &coupling).unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.failed_nodes, vec![0]);
        assert_eq!(outcome.x, vec![0.0, 1.0]);
    }

    /// Copies another node's last shared value.
    struct Follower {
        index: usize,
        leader: usize,
    }

    impl LocalProblem for Follower {
        fn variables(&self) -> Range<usize> {
            self.index..self.index + 1
        }

        fn solve(&self, _node: usize, _weights: &[f64], pinned: &[f64]) -> SolverResult<Vec<f64>> {
            Ok(vec![pinned[self.leader]])
        }
    }

    #[test]
    fn nodes_see_the_previous_round_of_shares() {
        let problems: Vec<Box<dyn LocalProblem>> = vec![
            Box::new(QuadraticProblem::tracking(0, vec![2.0], vec![0.0], vec![5.0]).unwrap()),
            Box::new(Follower { index: 1, leader: 0 }),
        ];
        let coupling = Coupling::homogeneous(vec![vec![0.0, 0.0]]).unwrap();
        let solver = DualDescentSolver::new(1e-9, 10, 0.5).unwrap();

        let outcome = solver.solve(&problems, &coupling).unwrap();
        // Round 1: (2, 0). Round 2: (2, 2). Round 3: unchanged.
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.x, vec![2.0, 2.0]);
    }

    #[test]
    fn rejects_overlapping_or_out_of_range_blocks() {
        let coupling = Coupling::homogeneous(vec![vec![1.0, 1.0]]).unwrap();
        let solver = DualDescentSolver::new(1e-3, 10, 0.5).unwrap();

        let overlapping = vec![tracking(0, 1.0), tracking(0, 1.0)];
        assert!(matches!(
            solver.solve(&overlapping, &coupling),
            Err(SolverError::Dimension(_))
        ));

        let outside = vec![tracking(2, 1.0)];
        assert!(matches!(
            solver.solve(&outside, &coupling),
            Err(SolverError::Dimension(_))
        ));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(DualDescentSolver::new(0.0, 10, 0.5).is_err());
        assert!(DualDescentSolver::new(1e-3, 0, 0.5).is_err());
        assert!(DualDescentSolver::new(1e-3, 10, 0.0).is_err());
        assert!(Coupling::new(vec![], vec![]).is_err());
        assert!(Coupling::new(vec![vec![1.0], vec![1.0, 2.0]], vec![0.0, 0.0]).is_err());
    }
}
