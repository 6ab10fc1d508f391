//! Core type aliases and tunable constants for the outbreak simulator.
//!
//! A small, dependency-light module of names shared across every other
//! module so that a reviewer can tell at a glance what a bare `f64` or
//! `usize` actually represents.

/// Simulation time, in arbitrary units consistent with `tbar`/`tmax`.
pub type Time = f64;
/// A probability in `[0, 1]`.
pub type Probability = f64;
/// A count of individuals, events, or bin entries.
pub type Count = u32;

/// Minimum positive `p` before the logarithmic-distribution series expansion
/// near `p -> 0` must be used instead of `mu = -p/((1-p) log(1-p))` directly.
pub const P_SERIES_EPS: f64 = 1e-8;
/// Default Newton/secant convergence tolerance for resolver root-finds.
pub const RESOLVE_EPS: f64 = 1e-12;
/// Default iteration cap for resolver root-finds.
pub const RESOLVE_MAXITER: u32 = 200;
/// Target percentile used to relate a gamma family's `(ave, kappa, x95)` triple.
pub const GAMMA_PERCENTILE: f64 = 0.95;
/// Default cap on current-infectious count per bin; `None` means unlimited.
pub const DEFAULT_NIMAX: Count = Count::MAX;
/// Default number of primary infectious individuals seeding a path.
pub const DEFAULT_NSTART: Count = 1;
/// Default number of paths simulated per run.
pub const DEFAULT_NPATHS: u64 = 10_000;
/// Initial capacity of the branching engine's layer stack.
pub const INITIAL_STACK_CAPACITY: usize = 64;
/// Growth factor applied to the layer stack when it is exhausted.
pub const STACK_GROWTH_FACTOR: f64 = 1.5;
