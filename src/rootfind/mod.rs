//! Generic root finder.
//!
//! The core loop is a clamp-then-check iteration over a caller-supplied
//! step function, distinguishing "stalled" (iterate stopped changing
//! before convergence) from "iteration limit reached" failures.

/// Outcome of a root-find attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootOutcome {
    Converged,
    Stalled,
    IterLimit,
}

/// Result of [`find`]: the final iterate, the last residual, and how the
/// search ended.
#[derive(Debug, Clone, Copy)]
pub struct RootResult {
    pub x: f64,
    pub residual: f64,
    pub outcome: RootOutcome,
}

impl RootResult {
    pub fn converged(&self) -> bool {
        self.outcome == RootOutcome::Converged
    }
}

/// Iterates `step` to convergence or `maxiter`, clamping each new iterate
/// into `[xmin, xmax]`.
///
/// `step` takes the current iterate and returns `(next_x, signed_residual)`;
/// it is typically a Newton update (closing over an analytic derivative) or
/// a secant update (closing over the previous iterate and residual).
pub fn find<F>(mut x: f64, mut step: F, eps: f64, maxiter: u32, xmin: f64, xmax: f64) -> RootResult
where
    F: FnMut(f64) -> (f64, f64),
{
    let mut iter = 0u32;
    let mut old_x = f64::NAN;
    let mut residual;
    loop {
        let (next_x, diff) = step(x);
        x = next_x;
        residual = diff;

        let same_x = x == old_x;
        old_x = x;

        if x > xmax {
            x = xmax;
        } else if x < xmin {
            x = xmin;
        }

        if residual.abs() < eps {
            return RootResult {
                x,
                residual,
                outcome: RootOutcome::Converged,
            };
        }
        iter += 1;
        if same_x {
            return RootResult {
                x,
                residual,
                outcome: RootOutcome::Stalled,
            };
        }
        if iter >= maxiter {
            return RootResult {
                x,
                residual,
                outcome: RootOutcome::IterLimit,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newton_finds_sqrt_two() {
        // f(x) = x^2 - 2, f'(x) = 2x
        let result = find(
            1.0,
            |x| {
                let diff = x * x - 2.0;
                let next = x - diff / (2.0 * x);
                (next, diff)
            },
            1e-13,
            100,
            0.0,
            10.0,
        );
        assert!(result.converged());
        assert!((result.x - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn stalls_when_iterate_stops_changing() {
        // A step function that immediately returns a fixed point whose
        // residual never drops below eps.
        let result = find(1.0, |_| (1.0, 5.0), 1e-12, 50, -10.0, 10.0);
        assert_eq!(result.outcome, RootOutcome::Stalled);
    }

    #[test]
    fn reports_iter_limit() {
        // Oscillate between two points that never satisfy the tolerance.
        let mut toggle = false;
        let result = find(
            0.0,
            move |_| {
                toggle = !toggle;
                (if toggle { 1.0 } else { 0.0 }, 5.0)
            },
            1e-12,
            10,
            -10.0,
            10.0,
        );
        assert_eq!(result.outcome, RootOutcome::IterLimit);
    }
}
