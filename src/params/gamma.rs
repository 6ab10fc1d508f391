//! Gamma-family percentile/shape solving.

use crate::core::{GAMMA_PERCENTILE, RESOLVE_EPS, RESOLVE_MAXITER};
use crate::error::{ResolveError, RootKind};
use crate::rootfind;
use statrs::distribution::{Continuous, ContinuousCDF, Gamma};

use super::{accept_root, GammaSpec};

/// Regularized lower incomplete gamma function `P(shape, x)`, i.e. the CDF
/// of a `Gamma(shape, rate = 1)` distribution evaluated at `x`, exploiting
/// the scale invariance `CDF(x; shape, rate=r) = P(shape, r*x)`.
pub fn cdf_gamma(shape: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    Gamma::new(shape, 1.0)
        .expect("positive shape")
        .cdf(x)
}

fn pdf_gamma(shape: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    Gamma::new(shape, 1.0).expect("positive shape").pdf(x)
}

/// A solved `(ave, kappa, x95)` triple plus the derived shape/scale pair.
pub type GammaTriple = GammaSpec;

/// Fills in whichever of `kappa`/`x95` is missing, given `ave` (mean) and
/// the target percentile `GAMMA_PERCENTILE` (0.95). Exactly one of `kappa`,
/// `x95` must be `Some`; `ave == 0.0` is the caller's responsibility to
/// special-case before calling this.
pub fn resolve_gamma_triple(
    ave: f64,
    kappa: Option<f64>,
    x95: Option<f64>,
) -> Result<GammaTriple, ResolveError> {
    match (kappa, x95) {
        (Some(_), Some(_)) => Err(ResolveError::Overdetermined { group: "gamma_kappa_x95" }),
        (None, None) => Err(ResolveError::Underdetermined { group: "gamma_kappa_x95" }),
        (Some(kappa), None) if kappa.is_infinite() => Ok(GammaSpec {
            ave,
            kappa,
            x95: ave,
            a: f64::INFINITY,
            b: 0.0,
        }),
        (Some(kappa), None) => {
            let x95 = solve_x95(ave, kappa)?;
            Ok(finite_spec(ave, kappa, x95))
        }
        (None, Some(x95)) => {
            let kappa = solve_kappa(ave, x95)?;
            Ok(finite_spec(ave, kappa, x95))
        }
    }
}

fn finite_spec(ave: f64, kappa: f64, x95: f64) -> GammaSpec {
    GammaSpec {
        ave,
        kappa,
        x95,
        a: kappa * ave,
        b: 1.0 / kappa,
    }
}

/// Newton-solves `CDF_Γ(ave*kappa, kappa*x95) = 0.95` for `x95`.
fn solve_x95(ave: f64, kappa: f64) -> Result<f64, ResolveError> {
    let ta = kappa * ave;
    let x0 = ave * 1.5_f64.max(1.0);
    let result = rootfind::find(
        x0,
        |x| {
            let diff = cdf_gamma(ta, kappa * x) - GAMMA_PERCENTILE;
            let deriv = kappa * pdf_gamma(ta, kappa * x);
            let next = if deriv.abs() > 1e-300 { x - diff / deriv } else { x };
            (next, diff)
        },
        RESOLVE_EPS,
        RESOLVE_MAXITER,
        0.0,
        ave * 1e6 + 1.0,
    );
    accept_root(result, RESOLVE_EPS, RootKind::GammaX95)
}

/// Secant-solves `CDF_Γ(ave*kappa, kappa*x95) = 0.95` for `kappa`, first
/// searching the unimodal regime `kappa > 1/ave`, falling back to the
/// monotone-decreasing regime `kappa in (0, 1/ave]`.
fn solve_kappa(ave: f64, x95: f64) -> Result<f64, ResolveError> {
    let target = |k: f64| cdf_gamma(k * ave, k * x95) - GAMMA_PERCENTILE;

    let first = secant_search(target, 1.5 / ave, 3.0 / ave);
    if first.converged() {
        return Ok(first.x);
    }
    let last = secant_search(target, 0.5 / ave, 0.9 / ave);
    accept_root(last, RESOLVE_EPS, RootKind::GammaKappa)
}

/// One secant search attempt over `[x0, x1]`.
fn secant_search<F: Fn(f64) -> f64>(f: F, x0: f64, x1: f64) -> rootfind::RootResult {
    let mut prev_x = x0;
    let mut prev_r = f(x0);
    rootfind::find(
        x1,
        move |x| {
            let r = f(x);
            let denom = r - prev_r;
            let next = if denom.abs() > 1e-300 {
                x - r * (x - prev_x) / denom
            } else {
                x
            };
            prev_x = x;
            prev_r = r;
            (next, r)
        },
        RESOLVE_EPS,
        RESOLVE_MAXITER,
        1e-9,
        1e9,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_round_trips() {
        let spec = resolve_gamma_triple(5.0, Some(2.0), None).unwrap();
        let lhs = cdf_gamma(spec.a, spec.kappa * spec.x95);
        assert!((lhs - 0.95).abs() < 1e-9, "got {lhs}");
    }

    #[test]
    fn kappa_round_trips_from_x95() {
        let forward = resolve_gamma_triple(5.0, Some(2.0), None).unwrap();
        let backward = resolve_gamma_triple(5.0, None, Some(forward.x95)).unwrap();
        assert!((backward.kappa - 2.0).abs() < 1e-4, "got {}", backward.kappa);
    }

    #[test]
    fn infinite_kappa_is_fixed_duration() {
        let spec = resolve_gamma_triple(5.0, Some(f64::INFINITY), None).unwrap();
        assert!(spec.is_fixed());
        assert_eq!(spec.x95, 5.0);
    }

    #[test]
    fn overdetermined_is_rejected() {
        let err = resolve_gamma_triple(5.0, Some(2.0), Some(6.0));
        assert!(matches!(err, Err(ResolveError::Overdetermined { .. })));
    }
}
