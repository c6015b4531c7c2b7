//! Name → constructor table for scheduling policies.
//!
//! Names are resolved once at startup, so an unknown policy is a
//! configuration error before the first tick.

use edgesim_core::SolverConfig;

use crate::dual::DualDescentScheduler;
use crate::edf::EdfScheduler;
use crate::error::{PlacementError, PlacementResult};
use crate::fairshare::FairshareScheduler;
use crate::random::RandomScheduler;
use crate::scheduler::Scheduler;
use crate::waggle::WaggleScheduler;

/// Inputs a policy may need at construction.
#[derive(Debug, Clone, Default)]
pub struct PolicyContext {
    pub seed: u64,
    pub solver: SolverConfig,
}

type Constructor = fn(&PolicyContext) -> Box<dyn Scheduler>;

const POLICIES: &[(&str, Constructor)] = &[
    ("random", random),
    ("edf", edf),
    ("fairshare", fairshare),
    ("waggle", waggle),
    ("dual-descent", dual_descent),
];

fn random(ctx: &PolicyContext) -> Box<dyn Scheduler> {
    Box::new(RandomScheduler::new(ctx.seed))
}

fn edf(_: &PolicyContext) -> Box<dyn Scheduler> {
    Box::new(EdfScheduler::new())
}

fn fairshare(_: &PolicyContext) -> Box<dyn Scheduler> {
    Box::new(FairshareScheduler::new())
}

fn waggle(_: &PolicyContext) -> Box<dyn Scheduler> {
    Box::new(WaggleScheduler::new())
}

fn dual_descent(ctx: &PolicyContext) -> Box<dyn Scheduler> {
    Box::new(DualDescentScheduler::new(ctx.solver.clone()))
}

/// Build the policy registered under `name`.
pub fn build_scheduler(name: &str, ctx: &PolicyContext) -> PlacementResult<Box<dyn Scheduler>> {
    POLICIES
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, constructor)| constructor(ctx))
        .ok_or_else(|| PlacementError::UnknownPolicy(name.to_string()))
}

/// Registered policy names, in registration order.
pub fn policy_names() -> impl Iterator<Item = &'static str> {
    POLICIES.iter().map(|(name, _)| *name)
}
