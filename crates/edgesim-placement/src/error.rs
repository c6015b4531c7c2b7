//! Placement error types.

use edgesim_cluster::ClusterError;
use edgesim_solver::SolverError;
use thiserror::Error;

pub type PlacementResult<T> = Result<T, PlacementError>;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(String),

    #[error("solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}
