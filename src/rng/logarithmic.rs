//! Finite logarithmic deviate (Devroye).
//!
//! Plain functions operating through the [`Substream`](super::Substream)
//! trait rather than a raw RNG handle.

use super::Substream;

/// Draw `v ~ U[0,1)`; if `v >= p` return 1; else draw `u ~ U[0,1)`, let
/// `q = 1 - exp(u * log(1 - p))`; if `v <= q^2` return `1 + floor(log(v) /
/// log(q))`; if `v <= q` return 2; else return 1.
pub fn log_finite<S: Substream + ?Sized>(s: &mut S, p: f64) -> u64 {
    let v = s.next_f64();
    if v >= p {
        return 1;
    }
    let r = (1.0 - p).ln();
    let u = s.next_f64();
    let q = 1.0 - (r * u).exp();
    if v <= q * q {
        1 + (v.ln() / q.ln()).floor() as u64
    } else if v <= q {
        2
    } else {
        1
    }
}

/// As [`log_finite`], but rejects draws of `1` until a value `>= 2` is
/// produced.
pub fn log_finite_gt1<S: Substream + ?Sized>(s: &mut S, p: f64) -> u64 {
    let r = (1.0 - p).ln();
    loop {
        let mut v = p * s.next_f64();
        while v == p {
            v = p * s.next_f64();
        }
        let u = s.next_f64();
        let q = 1.0 - (r * u).exp();
        if v <= q * q {
            return 1 + (v.ln() / q.ln()).floor() as u64;
        } else if v <= q {
            return 2;
        }
        // else: reject and redraw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngStream;

    #[test]
    fn log_finite_gt1_is_always_at_least_two() {
        let mut s = RngStream::split(11, 0);
        for _ in 0..5_000 {
            assert!(log_finite_gt1(&mut s, 0.3) >= 2);
        }
    }

    #[test]
    fn log_finite_is_finite_and_positive() {
        let mut s = RngStream::split(12, 0);
        for _ in 0..5_000 {
            let v = log_finite(&mut s, 0.5);
            assert!(v >= 1);
        }
    }
}
