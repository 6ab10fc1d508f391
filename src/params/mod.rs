//! Parameter resolver.
//!
//! Converts a sparse, overdetermined [`RawParams`] into a fully specified,
//! immutable [`ModelParams`] via closed-form relations and Newton/secant
//! root-finding (`crate::rootfind`).

mod gamma;
mod group;
mod resolve;

pub use gamma::{cdf_gamma, GammaTriple};
pub use resolve::resolve;

use crate::core::{Count, Probability, Time};
use crate::error::{ResolveError, RootKind};
use crate::rootfind::{RootOutcome, RootResult};

/// Accepts a root-find result: a converged iterate is used directly; a
/// *stalled* iterate is still accepted (with a warning) if its residual is
/// within `10 * eps` of the tolerance actually requested, since the iterate
/// stopped moving essentially at the solution. Anything else (a genuine
/// stall far from the target, or an iteration-limit abort) is a hard
/// failure.
fn accept_root(result: RootResult, eps: f64, kind: RootKind) -> Result<f64, ResolveError> {
    match result.outcome {
        RootOutcome::Converged => Ok(result.x),
        RootOutcome::Stalled if result.residual.abs() < 10.0 * eps => {
            log::warn!("{kind} root-find stalled just short of tolerance (residual = {}); accepting", result.residual);
            Ok(result.x)
        }
        _ => Err(ResolveError::RootFailed { kind, residual: result.residual }),
    }
}

/// The group-size distribution family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDist {
    /// Logarithmic distribution on `{2, 3, ...}` shifted by one invitee.
    LogPlus1,
    /// Logarithmic distribution on `{1, 2, ...}`, conditioned to exclude
    /// singleton events at the caller's discretion.
    Log,
    /// Geometric distribution on `{2, 3, ...}`.
    Geom,
    /// Discretized, doubly-truncated Gaussian on `{2, 3, ...}`.
    Gauss,
}

/// A resolved gamma-distributed duration: mean, shape parameter `kappa`,
/// 95th percentile, and the derived shape/scale pair `(a, b)` such that
/// `a = kappa * ave`, `b = 1 / kappa`. `kappa == f64::INFINITY` denotes a
/// fixed (non-random) duration equal to `ave`.
#[derive(Debug, Clone, Copy)]
pub struct GammaSpec {
    pub ave: Time,
    pub kappa: f64,
    pub x95: Time,
    pub a: f64,
    pub b: f64,
}

impl GammaSpec {
    pub fn is_fixed(&self) -> bool {
        self.kappa.is_infinite()
    }
}

/// An optional "interrupted period" distribution: with probability
/// `p_interrupt`, the main or alt communicable period is cut short by a
/// draw from this family.
#[derive(Debug, Clone, Copy)]
pub struct InterruptSpec {
    pub p_interrupt: Probability,
    pub gamma: GammaSpec,
}

/// Fully specified, immutable model parameters. `R0 = lambda * tbar *
/// (g_ave_transm - 1) * pinf`.
#[derive(Debug, Clone)]
pub struct ModelParams {
    // Reproduction-number block.
    pub r0: f64,
    pub lambda: f64,
    pub lambda_uncut: f64,
    pub tbar: Time,
    pub pinf: Probability,
    pub p: Probability,
    /// Group-size shape mean: the Gaussian mean for [`GroupDist::Gauss`],
    /// the logarithmic-series mean otherwise.
    pub mu: f64,
    pub g_ave: f64,
    pub g_ave_transm: f64,

    // Main communicable period.
    pub main: GammaSpec,
    // Alternate communicable period, selected with probability `q`.
    pub q: Probability,
    pub alt: Option<GammaSpec>,
    // Latent period, `None` means a fixed zero latent period.
    pub latent: Option<GammaSpec>,

    // Interrupted (test-and-isolate) periods.
    pub interrupted_main: Option<InterruptSpec>,
    pub interrupted_alt: Option<InterruptSpec>,

    // Group-size distribution.
    pub group: GroupDist,
    pub sigma: Option<f64>,
    pub rsigma: Option<f64>,

    pub nstart: Count,
    pub tmax: Time,
}

/// Sparse user input, as parsed from CLI options / config files. Every
/// field is optional; [`resolve`] fills in what it can and reports a
/// [`crate::error::ResolveError`] for whatever remains underdetermined or
/// invalid.
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    pub tbar: Option<Time>,
    pub p: Option<Probability>,
    pub lambda: Option<f64>,
    pub lambda_uncut: Option<f64>,
    pub kappa: Option<f64>,
    pub t95: Option<Time>,

    pub lbar: Option<Time>,
    pub kappal: Option<f64>,
    pub l95: Option<Time>,

    pub q: Option<Probability>,
    pub mbar: Option<Time>,
    pub kappaq: Option<f64>,
    pub m95: Option<Time>,

    pub r0: Option<f64>,
    pub mu: Option<f64>,
    pub pinf: Option<Probability>,
    pub g_ave: Option<f64>,
    pub sigma: Option<f64>,
    pub rsigma: Option<f64>,

    pub pit: Option<Probability>,
    pub itbar: Option<Time>,
    pub kappait: Option<f64>,
    pub it95: Option<Time>,

    pub pim: Option<Probability>,
    pub imbar: Option<Time>,
    pub kappaim: Option<f64>,
    pub im95: Option<Time>,

    pub group: GroupDist,
    pub group_interactions: bool,

    pub tmax: Option<Time>,
    pub nstart: Option<Count>,
}

impl Default for GroupDist {
    fn default() -> Self {
        GroupDist::LogPlus1
    }
}
