//! Group-size distribution fill: derives a family's shape parameter(s) and
//! mean invitee count from whichever of `g_ave`/`p`/`mu` the caller
//! supplied, plus the `lambda`/`lambda_uncut` conversion and the
//! `groupinteractions` correction to `g_ave_transm` where supported.

use crate::core::{P_SERIES_EPS, RESOLVE_EPS, RESOLVE_MAXITER};
use crate::error::{ResolveError, RootKind};
use crate::rootfind;
use statrs::distribution::{ContinuousCDF, Normal};

use super::{accept_root, GroupDist};

/// Mean of a logarithmic-series distribution with parameter `p`. Uses a
/// first-order series expansion near `p -> 0`, where the closed form is a
/// `0/0` indeterminate.
pub fn log_series_mean(p: Probability) -> f64 {
    if p < P_SERIES_EPS {
        return 1.0 + p / 2.0;
    }
    if p > 1.0 - 1e-14 {
        return f64::INFINITY;
    }
    -p / ((1.0 - p) * (1.0 - p).ln())
}

type Probability = f64;

/// Newton-solves `p` from a target logarithmic-series mean `mu`
/// (`log_plus_1` and `log` tags): `f(p) = mu + p/((1-p) log(1-p))`.
pub fn solve_p_from_mu(mu: f64) -> Result<Probability, ResolveError> {
    if mu <= 1.0 + 1e-12 {
        return Ok(0.0);
    }
    let f = |p: f64| mu - log_series_mean(p);
    let h = 1e-7;
    let result = rootfind::find(
        0.5,
        |p| {
            let fp = f(p);
            let deriv = (f((p + h).min(1.0 - 1e-10)) - f((p - h).max(1e-10))) / (2.0 * h);
            let next = if deriv.abs() > 1e-300 { p - fp / deriv } else { p };
            (next, fp)
        },
        RESOLVE_EPS,
        RESOLVE_MAXITER,
        1e-12,
        1.0 - 1e-12,
    );
    accept_root(result, RESOLVE_EPS, RootKind::LogPFromMu)
}

/// `log_plus_1`: group size is `1 + Logarithmic(p)`, so `mu = g_ave - 1`.
pub fn log_plus_1_from_g_ave(g_ave: f64) -> Result<(Probability, f64), ResolveError> {
    let mu = g_ave - 1.0;
    if mu <= 0.0 {
        return Err(ResolveError::OutOfRange { name: "g_ave", value: g_ave });
    }
    let p = solve_p_from_mu(mu)?;
    Ok((p, mu))
}

/// `geom`: closed form `p = (g_ave - 2)/(g_ave + 1)`, `mu = 1/(1-p)`.
pub fn geom_from_g_ave(g_ave: f64) -> Result<(Probability, f64), ResolveError> {
    if g_ave < 2.0 {
        return Err(ResolveError::OutOfRange { name: "g_ave", value: g_ave });
    }
    let p = (g_ave - 2.0) / (g_ave + 1.0);
    let mu = 1.0 / (1.0 - p);
    Ok((p, mu))
}

/// `groupinteractions` correction for `log_plus_1`:
/// `g_ave - (1 + log(1-p)/p) * mu^2 / g_ave`.
pub fn g_ave_transm_log_plus_1(g_ave: f64, p: Probability, mu: f64) -> f64 {
    if p <= P_SERIES_EPS {
        return g_ave;
    }
    g_ave - (1.0 + (1.0 - p).ln() / p) * mu * mu / g_ave
}

/// `groupinteractions` correction for `log`.
pub fn g_ave_transm_log(g_ave: f64, p: Probability) -> f64 {
    if p <= P_SERIES_EPS {
        return g_ave;
    }
    let l1mp = (1.0 - p).ln();
    g_ave - ((p - 2.0) * l1mp - 2.0 * p) / ((1.0 - p) * (p + l1mp))
}

/// Discretized, doubly-truncated Gaussian mean on support `{2, 3, ...}`,
/// given underlying (unbounded) mean `mu_raw` and standard deviation
/// `sigma`. Sums both tails symmetrically around `mu_raw`, capping once the
/// incremental normal CDF contribution is negligible.
pub fn truncated_gauss_mean(mu_raw: f64, sigma: f64) -> f64 {
    let normal = Normal::new(mu_raw, sigma).expect("positive sigma");
    let lo = 2i64;
    let mut num = 0.0;
    let mut den = 0.0;
    let mut k = lo;
    loop {
        let mass = normal.cdf(k as f64 + 0.5) - normal.cdf(k as f64 - 0.5);
        num += mass * k as f64;
        den += mass;
        let done_low = k > lo && mass < f64::EPSILON;
        k += 1;
        if done_low && (k as f64) > mu_raw + 20.0 * sigma {
            break;
        }
        if k as f64 > mu_raw + 50.0 * sigma.max(1.0) {
            break;
        }
    }
    // Remaining mass below the support floor folds onto the floor bin.
    let floor_mass = normal.cdf(lo as f64 - 0.5);
    num += floor_mass * lo as f64;
    den += floor_mass;
    num / den
}

/// Secant-solves the underlying Gaussian mean `mu_raw` such that
/// [`truncated_gauss_mean`] equals the target `g_ave`.
pub fn solve_gauss_mu(g_ave: f64, sigma: f64) -> Result<f64, ResolveError> {
    let f = |mu_raw: f64| truncated_gauss_mean(mu_raw, sigma) - g_ave;
    let mut prev_x = g_ave - 1.0;
    let mut prev_r = f(prev_x);
    let result = rootfind::find(
        g_ave,
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
        RESOLVE_EPS.max(1e-9),
        RESOLVE_MAXITER,
        -1e6,
        1e6,
    );
    accept_root(result, RESOLVE_EPS.max(1e-9), RootKind::GaussMu)
}

/// Converts between `lambda` (events with >= 2 invitees) and
/// `lambda_uncut` (all events, including singletons) for the given group
/// distribution.
pub fn lambda_from_lambda_uncut(group: GroupDist, lambda_uncut: f64, p: Probability, mu: f64, sigma: Option<f64>) -> f64 {
    match group {
        GroupDist::LogPlus1 => lambda_uncut,
        GroupDist::Log => {
            if p <= P_SERIES_EPS {
                lambda_uncut
            } else {
                let l = (1.0 - p).ln();
                (l + p) / l * lambda_uncut
            }
        }
        GroupDist::Geom => lambda_uncut,
        GroupDist::Gauss => {
            let sigma = sigma.unwrap_or(1.0);
            let normal = Normal::new(0.0, 1.0).expect("standard normal");
            let tail = 1.0 - normal.cdf((1.5 - mu) / sigma);
            lambda_uncut * tail
        }
    }
}

pub fn lambda_uncut_from_lambda(group: GroupDist, lambda: f64, p: Probability, mu: f64, sigma: Option<f64>) -> f64 {
    match group {
        GroupDist::LogPlus1 | GroupDist::Geom => lambda,
        GroupDist::Log => {
            if p <= P_SERIES_EPS {
                lambda
            } else {
                let l = (1.0 - p).ln();
                lambda * l / (l + p)
            }
        }
        GroupDist::Gauss => {
            let sigma = sigma.unwrap_or(1.0);
            let normal = Normal::new(0.0, 1.0).expect("standard normal");
            let tail = 1.0 - normal.cdf((1.5 - mu) / sigma);
            lambda / tail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_plus_1_round_trips_p_and_mu() {
        let (p, mu) = log_plus_1_from_g_ave(6.0).unwrap();
        let back = log_series_mean(p);
        assert!((back - mu).abs() < 1e-8, "p={p} mu={mu} back={back}");
    }

    #[test]
    fn geom_closed_form_matches_mean() {
        let (p, mu) = geom_from_g_ave(5.0).unwrap();
        assert!((p - 0.6).abs() < 1e-12);
        assert!((mu - 2.5).abs() < 1e-12);
    }

    #[test]
    fn log_series_mean_limit_is_one() {
        assert!((log_series_mean(1e-10) - 1.0).abs() < 1e-6);
    }
}
