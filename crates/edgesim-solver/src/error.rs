//! Solver error types.

use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// The local feasible set is empty.
    #[error("node {node}: infeasible subproblem ({reason})")]
    Infeasible { node: usize, reason: String },

    /// The local objective grows without bound on the feasible set.
    #[error("node {node}: unbounded subproblem in variable {variable}")]
    Unbounded { node: usize, variable: usize },

    /// Matrix, bound or block sizes disagree.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    #[error("invalid solver parameter: {0}")]
    Parameter(String),
}
