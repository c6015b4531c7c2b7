//! edgesim-solver — dual decomposition across nodes.
//!
//! Each node owns a block of decision variables and a concave local
//! objective. A shared linear constraint `G·x ≤ h` couples the blocks.
//! The solver relaxes the coupling with Lagrange multipliers and runs
//! synchronous rounds:
//!
//! ```text
//! repeat:
//!   every node: x_i ← argmax f_i(x_i) + λᵀ·G·x   (others pinned at currentX)
//!   share:      currentX ← concat(x_i)
//!   dual:       λ ← λ − α·(G·currentX − h)
//! until ‖x_k − x_{k−1}‖ < tolerance or k = max_iters
//! ```
//!
//! A node whose subproblem fails keeps its previous block for that round.

pub mod dual;
pub mod error;
pub mod problem;

pub use dual::{Coupling, DualDescentOutcome, DualDescentSolver};
pub use error::{SolverError, SolverResult};
pub use problem::{LocalProblem, QuadraticProblem};
