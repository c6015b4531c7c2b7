//! edgesim-placement — scheduling policies for the simulated fleet.
//!
//! A policy looks at the pending queue and the cluster once per tick and
//! returns an ordered list of `(workload, node)` decisions. The runner
//! applies them in order; the cluster refuses any that would overcommit
//! a node.
//!
//! # Policies
//!
//! | name           | workload order        | node choice                                  |
//! |----------------|-----------------------|----------------------------------------------|
//! | `random`       | arrival               | uniform, no fit check                        |
//! | `edf`          | ascending deadline    | first fitting node                           |
//! | `fairshare`    | arrival               | fitting node with least CPU in use           |
//! | `waggle`       | pluggable             | GPU-exclusive eligibility, least loaded      |
//! | `dual-descent` | arrival               | largest remaining dual-descent quota         |
//!
//! # Components
//!
//! - **`scheduler`** — the `Scheduler` trait and tentative placement
//! - **`scorer`** — node ranking and load summaries
//! - **`registry`** — policy lookup by name

pub mod dual;
pub mod edf;
pub mod error;
pub mod fairshare;
pub mod random;
pub mod registry;
pub mod scheduler;
pub mod scorer;
pub mod waggle;

pub use dual::DualDescentScheduler;
pub use edf::EdfScheduler;
pub use error::{PlacementError, PlacementResult};
pub use fairshare::FairshareScheduler;
pub use random::RandomScheduler;
pub use registry::{PolicyContext, build_scheduler, policy_names};
pub use scheduler::{Decision, Scheduler, VirtualCluster};
pub use scorer::{NodeScore, best_node, load_imbalance, mean_utilization, rank_nodes};
pub use waggle::{GpuFirst, InputOrder, WaggleScheduler, WorkloadOrder, is_eligible};
