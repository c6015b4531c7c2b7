//! Per-node local subproblems.

use std::ops::Range;

use crate::error::{SolverError, SolverResult};

/// The part of the global problem a single node owns.
pub trait LocalProblem {
    /// Indices of the global variable vector owned by this node.
    fn variables(&self) -> Range<usize>;

    /// Maximize the local objective plus `Σ weights[j]·x[j]` over the owned
    /// variables. `weights` is `Gᵀλ` for the whole vector; `pinned` holds the
    /// last shared value of every variable, including the ones owned by
    /// other nodes. Returns the new values of the owned block.
    fn solve(&self, node: usize, weights: &[f64], pinned: &[f64]) -> SolverResult<Vec<f64>>;
}

/// Separable concave quadratic objective with box constraints:
///
/// `maximize Σ linear[k]·x_k − ½·curvature[k]·x_k²  s.t. lower[k] ≤ x_k ≤ upper[k]`
///
/// Zero curvature makes the block linear; it then needs finite bounds in
/// the direction the objective pushes.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticProblem {
    offset: usize,
    linear: Vec<f64>,
    curvature: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl QuadraticProblem {
    pub fn new(
        offset: usize,
        linear: Vec<f64>,
        curvature: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> SolverResult<Self> {
        let len = linear.len();
        if curvature.len() != len || lower.len() != len || upper.len() != len {
            return Err(SolverError::Dimension(format!(
                "block at {offset}: {len} linear terms but {} curvature, {} lower, {} upper",
                curvature.len(),
                lower.len(),
                upper.len()
            )));
        }
        if curvature.iter().any(|q| !(*q >= 0.0) || !q.is_finite()) {
            return Err(SolverError::Parameter(format!(
                "block at {offset}: curvature must be finite and non-negative"
            )));
        }
        if linear.iter().any(|c| !c.is_finite()) {
            return Err(SolverError::Parameter(format!(
                "block at {offset}: linear terms must be finite"
            )));
        }
        Ok(Self {
            offset,
            linear,
            curvature,
            lower,
            upper,
        })
    }

    /// `maximize −½·Σ (x_k − target_k)²`, i.e. stay as close to the targets
    /// as the multipliers allow.
    pub fn tracking(offset: usize, targets: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> SolverResult<Self> {
        let curvature = vec![1.0; targets.len()];
        Self::new(offset, targets, curvature, lower, upper)
    }

    /// Purely linear objective `Σ costs[k]·x_k`.
    pub fn linear(offset: usize, costs: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> SolverResult<Self> {
        let curvature = vec![0.0; costs.len()];
        Self::new(offset, costs, curvature, lower, upper)
    }
}

impl LocalProblem for QuadraticProblem {
    fn variables(&self) -> Range<usize> {
        self.offset..self.offset + self.linear.len()
    }

    fn solve(&self, node: usize, weights: &[f64], pinned: &[f64]) -> SolverResult<Vec<f64>> {
        let range = self.variables();
        if weights.len() < range.end || pinned.len() < range.end {
            return Err(SolverError::Dimension(format!(
                "node {node}: block {range:?} outside a vector of {} weights",
                weights.len()
            )));
        }

        let mut block = Vec::with_capacity(range.len());
        for (k, j) in range.enumerate() {
            let (lo, hi) = (self.lower[k], self.upper[k]);
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(SolverError::Infeasible {
                    node,
                    reason: format!("variable {j}: bounds [{lo}, {hi}]"),
                });
            }

            let gradient = self.linear[k] + weights[j];
            let q = self.curvature[k];
            let value = if q > 0.0 {
                (gradient / q).clamp(lo, hi)
            } else if gradient > 0.0 {
                if !hi.is_finite() {
                    return Err(SolverError::Unbounded { node, variable: j });
                }
                hi
            } else if gradient < 0.0 {
                if !lo.is_finite() {
                    return Err(SolverError::Unbounded { node, variable: j });
                }
                lo
            } else {
                // Flat objective: any feasible point is optimal, stay put.
                pinned[j].clamp(lo, hi)
            };
            block.push(value);
        }
        Ok(block)
    }
}
