//! Top-level parameter resolution.
//!
//! Fills a [`super::RawParams`] into a [`super::ModelParams`], validating
//! every invariant and surfacing the first violation found.

use crate::error::ResolveError;

use super::gamma::resolve_gamma_triple;
use super::group::{
    g_ave_transm_log, g_ave_transm_log_plus_1, geom_from_g_ave, lambda_from_lambda_uncut,
    lambda_uncut_from_lambda, log_plus_1_from_g_ave, log_series_mean, solve_gauss_mu,
    solve_p_from_mu, truncated_gauss_mean,
};
use super::{GammaSpec, GroupDist, InterruptSpec, ModelParams, RawParams};

/// Resolves a sparse [`RawParams`] into a fully specified [`ModelParams`],
/// or the first [`ResolveError`] encountered.
pub fn resolve(raw: &RawParams) -> Result<ModelParams, ResolveError> {
    let (p, mu, g_ave) = resolve_group_shape(raw)?;

    if raw.group == GroupDist::Gauss && raw.group_interactions {
        return Err(ResolveError::ValidationFailed {
            code: "group_interactions_gauss_unsupported",
            detail: "the gauss group distribution has no groupinteractions correction".into(),
        });
    }
    if raw.group == GroupDist::Geom && raw.group_interactions {
        return Err(ResolveError::ValidationFailed {
            code: "group_interactions_geom_unsupported",
            detail: "the geom group distribution has no groupinteractions correction".into(),
        });
    }

    let g_ave_transm = resolve_g_ave_transm(raw, p, mu, g_ave)?;

    let main = resolve_gamma_triple(
        raw.tbar.ok_or(ResolveError::Underdetermined { group: "tbar" })?,
        raw.kappa,
        raw.t95,
    )?;

    let (r0, pinf, lambda, lambda_uncut) = resolve_r0_block(raw, g_ave_transm, main.ave, p, mu)?;

    let alt = resolve_optional_gamma(raw.mbar, raw.kappaq, raw.m95)?;
    let q = raw.q.unwrap_or(0.0);
    if alt.is_some() != (q > 0.0) {
        return Err(ResolveError::ValidationFailed {
            code: "alt_period_vs_q",
            detail: "alt period and q must both be given or both omitted".into(),
        });
    }

    let latent = resolve_optional_gamma(raw.lbar, raw.kappal, raw.l95)?;

    let interrupted_main = resolve_interrupt(raw.pit, raw.itbar, raw.kappait, raw.it95)?;
    let interrupted_alt = resolve_interrupt(raw.pim, raw.imbar, raw.kappaim, raw.im95)?;

    validate(r0, pinf, g_ave, main.ave)?;

    Ok(ModelParams {
        r0,
        lambda,
        lambda_uncut,
        tbar: main.ave,
        pinf,
        p,
        mu,
        g_ave,
        g_ave_transm,
        main,
        q,
        alt,
        latent,
        interrupted_main,
        interrupted_alt,
        group: raw.group,
        sigma: raw.sigma,
        rsigma: raw.rsigma,
        nstart: raw.nstart.unwrap_or(crate::core::DEFAULT_NSTART),
        tmax: raw.tmax.unwrap_or(f64::INFINITY),
    })
}

/// Resolves the group-size distribution's shape parameter(s) `(p, mu)` and
/// mean invitee count `g_ave`. `g_ave`, `p`, and `mu` are interchangeable
/// alternative inputs; exactly one must be given and the other two are
/// derived from it.
fn resolve_group_shape(raw: &RawParams) -> Result<(f64, f64, f64), ResolveError> {
    match raw.group {
        GroupDist::LogPlus1 | GroupDist::Log => match (raw.g_ave, raw.mu, raw.p) {
            (Some(g_ave), None, None) => {
                let (p, mu) = log_plus_1_from_g_ave(g_ave)?;
                Ok((p, mu, g_ave))
            }
            (None, Some(mu), None) => {
                let p = solve_p_from_mu(mu)?;
                Ok((p, mu, mu + 1.0))
            }
            (None, None, Some(p)) => {
                if !(0.0..1.0).contains(&p) {
                    return Err(ResolveError::OutOfRange { name: "p", value: p });
                }
                let mu = log_series_mean(p);
                Ok((p, mu, mu + 1.0))
            }
            (None, None, None) => Err(ResolveError::Underdetermined { group: "g_ave_p_mu" }),
            _ => Err(ResolveError::Overdetermined { group: "g_ave_p_mu" }),
        },
        GroupDist::Geom => match (raw.g_ave, raw.mu, raw.p) {
            (Some(g_ave), None, None) => {
                let (p, mu) = geom_from_g_ave(g_ave)?;
                Ok((p, mu, g_ave))
            }
            (None, Some(mu), None) => {
                if mu <= 1.0 {
                    return Err(ResolveError::OutOfRange { name: "mu", value: mu });
                }
                let p = 1.0 - 1.0 / mu;
                Ok((p, mu, 3.0 * mu - 1.0))
            }
            (None, None, Some(p)) => {
                if !(0.0..1.0).contains(&p) {
                    return Err(ResolveError::OutOfRange { name: "p", value: p });
                }
                let mu = 1.0 / (1.0 - p);
                Ok((p, mu, 3.0 * mu - 1.0))
            }
            (None, None, None) => Err(ResolveError::Underdetermined { group: "g_ave_p_mu" }),
            _ => Err(ResolveError::Overdetermined { group: "g_ave_p_mu" }),
        },
        GroupDist::Gauss => match (raw.g_ave, raw.mu) {
            (Some(g_ave), None) => {
                let sigma = raw
                    .sigma
                    .or(raw.rsigma.map(|r| r * g_ave))
                    .ok_or(ResolveError::Underdetermined { group: "sigma_or_rsigma" })?;
                let mu = solve_gauss_mu(g_ave, sigma)?;
                Ok((0.0, mu, g_ave))
            }
            (None, Some(mu)) => {
                let sigma = raw.sigma.ok_or(ResolveError::Underdetermined { group: "sigma_or_rsigma" })?;
                let g_ave = truncated_gauss_mean(mu, sigma);
                Ok((0.0, mu, g_ave))
            }
            (Some(_), Some(_)) => Err(ResolveError::Overdetermined { group: "g_ave_mu" }),
            (None, None) => Err(ResolveError::Underdetermined { group: "g_ave_mu" }),
        },
    }
}

fn resolve_g_ave_transm(raw: &RawParams, p: f64, mu: f64, g_ave: f64) -> Result<f64, ResolveError> {
    if !raw.group_interactions {
        return Ok(g_ave);
    }
    Ok(match raw.group {
        GroupDist::LogPlus1 => g_ave_transm_log_plus_1(g_ave, p, mu),
        GroupDist::Log => g_ave_transm_log(g_ave, p),
        GroupDist::Geom => unreachable!("rejected above"),
        GroupDist::Gauss => unreachable!("rejected above"),
    })
}

/// Resolves the reproduction-number block: `R0 = lambda * tbar *
/// (g_ave_transm - 1) * pinf`. `lambda` may be given directly, via
/// `lambda_uncut`, or derived from `r0`/`pinf`; exactly one of
/// `{lambda|lambda_uncut, pinf, r0}` is left for the other two (plus the
/// fixed `g_ave_transm`/`tbar`) to determine.
fn resolve_r0_block(
    raw: &RawParams,
    g_ave_transm: f64,
    tbar: f64,
    p: f64,
    mu: f64,
) -> Result<(f64, f64, f64, f64), ResolveError> {
    let sigma = raw.sigma;
    let base = (g_ave_transm - 1.0) * tbar;
    if base <= 0.0 {
        return Err(ResolveError::OutOfRange { name: "g_ave_transm", value: g_ave_transm });
    }

    match (raw.lambda, raw.lambda_uncut) {
        (Some(lambda), None) => {
            let lambda_uncut = lambda_uncut_from_lambda(raw.group, lambda, p, mu, sigma);
            let (r0, pinf) = resolve_r0_pinf(raw.r0, raw.pinf, lambda, base)?;
            Ok((r0, pinf, lambda, lambda_uncut))
        }
        (None, Some(lambda_uncut)) => {
            let lambda = lambda_from_lambda_uncut(raw.group, lambda_uncut, p, mu, sigma);
            let (r0, pinf) = resolve_r0_pinf(raw.r0, raw.pinf, lambda, base)?;
            Ok((r0, pinf, lambda, lambda_uncut))
        }
        (Some(_), Some(_)) => Err(ResolveError::Overdetermined { group: "lambda_lambda_uncut" }),
        (None, None) => {
            let r0 = raw.r0.ok_or(ResolveError::Underdetermined { group: "lambda_block" })?;
            let pinf = raw.pinf.ok_or(ResolveError::Underdetermined { group: "lambda_block" })?;
            if pinf <= 0.0 {
                return Err(ResolveError::OutOfRange { name: "pinf", value: pinf });
            }
            let lambda = r0 / (pinf * base);
            let lambda_uncut = lambda_uncut_from_lambda(raw.group, lambda, p, mu, sigma);
            Ok((r0, pinf, lambda, lambda_uncut))
        }
    }
}

/// Resolves whichever of `r0`/`pinf` is missing given the other plus the
/// already-known `lambda * base` product, or cross-checks both if present.
fn resolve_r0_pinf(
    r0: Option<f64>,
    pinf: Option<f64>,
    lambda: f64,
    base: f64,
) -> Result<(f64, f64), ResolveError> {
    match (r0, pinf) {
        (Some(r0), Some(pinf)) => {
            if pinf <= 0.0 {
                return Err(ResolveError::OutOfRange { name: "pinf", value: pinf });
            }
            let check = pinf * lambda * base;
            if (check - r0).abs() > 1e-6 * r0.abs().max(1.0) {
                return Err(ResolveError::Overdetermined { group: "r0_pinf" });
            }
            Ok((r0, pinf))
        }
        (Some(r0), None) => {
            if lambda * base <= 0.0 {
                return Err(ResolveError::OutOfRange { name: "r0_inputs", value: r0 });
            }
            Ok((r0, r0 / (lambda * base)))
        }
        (None, Some(pinf)) => {
            if pinf <= 0.0 {
                return Err(ResolveError::OutOfRange { name: "pinf", value: pinf });
            }
            Ok((pinf * lambda * base, pinf))
        }
        (None, None) => Err(ResolveError::Underdetermined { group: "r0_pinf" }),
    }
}

fn resolve_optional_gamma(
    ave: Option<f64>,
    kappa: Option<f64>,
    x95: Option<f64>,
) -> Result<Option<GammaSpec>, ResolveError> {
    match ave {
        None => {
            if kappa.is_some() || x95.is_some() {
                return Err(ResolveError::ValidationFailed {
                    code: "orphaned_shape_param",
                    detail: "kappa/x95 given without the corresponding mean".into(),
                });
            }
            Ok(None)
        }
        Some(ave) => Ok(Some(resolve_gamma_triple(ave, kappa, x95)?)),
    }
}

fn resolve_interrupt(
    p: Option<f64>,
    ave: Option<f64>,
    kappa: Option<f64>,
    x95: Option<f64>,
) -> Result<Option<InterruptSpec>, ResolveError> {
    match p {
        None => Ok(None),
        Some(p_interrupt) => {
            let ave = ave.ok_or(ResolveError::Underdetermined { group: "interrupt_period" })?;
            let gamma = resolve_gamma_triple(ave, kappa, x95)?;
            Ok(Some(InterruptSpec { p_interrupt, gamma }))
        }
    }
}

fn validate(r0: f64, pinf: f64, g_ave: f64, tbar: f64) -> Result<(), ResolveError> {
    if !(0.0..=1.0).contains(&pinf) {
        return Err(ResolveError::OutOfRange { name: "pinf", value: pinf });
    }
    if r0 < 0.0 {
        return Err(ResolveError::OutOfRange { name: "r0", value: r0 });
    }
    if g_ave < 1.0 {
        return Err(ResolveError::OutOfRange { name: "g_ave", value: g_ave });
    }
    if tbar <= 0.0 {
        return Err(ResolveError::OutOfRange { name: "tbar", value: tbar });
    }
    Ok(())
}
