//! Parallel path dispatch.
//!
//! A shared atomic "next set index" counter is fetch-added by each worker;
//! each set covers a contiguous block of paths against that worker's own
//! RNG substream.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::Count;
use crate::engine::Engine;
use crate::params::ModelParams;
use crate::rng::RngStream;
use crate::stats::StatsAccumulator;

/// Paths dispatched per fetch-add.
const SET_SIZE: u64 = 64;

/// Runs `n_paths` single-threaded, folding every path into one
/// [`StatsAccumulator`]. Useful for tests and for `--jobs 1`.
pub fn simulate(params: &ModelParams, seed: u64, n_paths: u64, nimax: Count) -> StatsAccumulator {
    let mut engine: Engine<StatsAccumulator> = Engine::new();
    let mut rng = RngStream::split(seed, 0);
    let mut stats = StatsAccumulator::new(params, nimax);
    for _ in 0..n_paths {
        engine.run_path(params, &mut rng, &mut stats);
    }
    stats
}

/// Runs `n_paths` across `n_threads` workers via `rayon`, each thread
/// claiming contiguous sets of `SET_SIZE` paths from a shared atomic
/// counter until the budget is exhausted, then reduces every thread's
/// [`StatsAccumulator`] into one.
///
/// Reproducibility: for a fixed `seed`, `n_threads`, and `n_paths`, the
/// assignment of path indices to substreams is identical across runs
/// regardless of how the OS schedules the underlying threads, because each
/// substream is derived solely from `seed` and its own thread index, and
/// every path drawn from a given substream draws in the same fixed order.
pub fn simulate_parallel(
    params: &ModelParams,
    seed: u64,
    n_paths: u64,
    nimax: Count,
    n_threads: usize,
) -> StatsAccumulator {
    let n_threads = n_threads.max(1);
    let next_set_index = AtomicU64::new(0);
    let n_sets = n_paths.div_ceil(SET_SIZE);
    log::debug!("dispatching {n_paths} paths across {n_threads} worker(s) in {n_sets} sets of {SET_SIZE}");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .expect("thread pool construction");

    let partials: Vec<StatsAccumulator> = pool.install(|| {
        use rayon::prelude::*;
        (0..n_threads)
            .into_par_iter()
            .map(|thread_index| {
                let mut engine: Engine<StatsAccumulator> = Engine::new();
                let mut rng = RngStream::split(seed, thread_index as u64);
                let mut stats = StatsAccumulator::new(params, nimax);
                loop {
                    let set = next_set_index.fetch_add(1, Ordering::Relaxed);
                    if set >= n_sets {
                        break;
                    }
                    let start = set * SET_SIZE;
                    let end = (start + SET_SIZE).min(n_paths);
                    for _ in start..end {
                        engine.run_path(params, &mut rng, &mut stats);
                    }
                }
                stats
            })
            .collect()
    });

    reduce(partials)
}

fn reduce(mut partials: Vec<StatsAccumulator>) -> StatsAccumulator {
    let mut acc = partials.remove(0);
    for other in partials {
        acc.merge(other);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{resolve, GroupDist, RawParams};

    fn params() -> ModelParams {
        let raw = RawParams {
            tbar: Some(4.0),
            kappa: Some(f64::INFINITY),
            g_ave: Some(3.0),
            r0: Some(0.6),
            pinf: Some(1.0),
            group: GroupDist::LogPlus1,
            tmax: Some(20.0),
            nstart: Some(1),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn sequential_and_parallel_agree_on_path_count() {
        let p = params();
        let seq = simulate(&p, 123, 500, Count::MAX);
        let par = simulate_parallel(&p, 123, 500, Count::MAX, 4);
        assert_eq!(seq.summary().n_paths, 500);
        assert_eq!(par.summary().n_paths, 500);
    }

    fn assert_summaries_bit_exact(a: &crate::stats::Summary, b: &crate::stats::Summary) {
        assert_eq!(a.n_paths, b.n_paths);
        assert_eq!(a.mean_r.to_bits(), b.mean_r.to_bits());
        assert_eq!(a.mean_commper.to_bits(), b.mean_commper.to_bits());
        assert_eq!(a.mean_events.to_bits(), b.mean_events.to_bits());
        assert_eq!(a.p_extinct.0.to_bits(), b.p_extinct.0.to_bits());
        assert_eq!(a.p_extinct.1.to_bits(), b.p_extinct.1.to_bits());
        for (x, y) in a.cumulative_infected.overall.iter().zip(&b.cumulative_infected.overall) {
            assert_eq!(x.0.to_bits(), y.0.to_bits());
            assert_eq!(x.1.to_bits(), y.1.to_bits());
        }
    }

    #[test]
    fn repeated_sequential_runs_are_bit_exact() {
        let p = params();
        let a = simulate(&p, 321, 800, Count::MAX);
        let b = simulate(&p, 321, 800, Count::MAX);
        assert_summaries_bit_exact(&a.summary(), &b.summary());
    }

    #[test]
    fn repeated_parallel_runs_are_bit_exact() {
        let p = params();
        let a = simulate_parallel(&p, 321, 800, Count::MAX, 4);
        let b = simulate_parallel(&p, 321, 800, Count::MAX, 4);
        assert_summaries_bit_exact(&a.summary(), &b.summary());
    }

    #[test]
    fn frame_count_conserves_against_new_infections() {
        use crate::engine::Engine;
        use crate::rng::RngStream;
        use crate::stats::StatsAccumulator;

        let p = params();
        let mut rng = RngStream::split(99, 0);
        let mut engine: Engine<StatsAccumulator> = Engine::new();
        let mut stats = StatsAccumulator::new(&p, Count::MAX);
        for _ in 0..300 {
            engine.run_path(&p, &mut rng, &mut stats);
        }
        let n_paths = stats.summary().n_paths as f64;
        let expected = stats.total_frames() as f64 - p.nstart as f64 * n_paths;
        assert!((stats.total_new_infections() - expected).abs() < 1e-6);
    }

    #[test]
    fn increasing_r0_increases_mean_cumulative_infections() {
        let mut raw = RawParams {
            tbar: Some(4.0),
            kappa: Some(f64::INFINITY),
            g_ave: Some(3.0),
            r0: Some(0.8),
            pinf: Some(1.0),
            group: GroupDist::LogPlus1,
            tmax: Some(20.0),
            nstart: Some(1),
            ..Default::default()
        };
        let low = resolve(&raw).unwrap();
        raw.r0 = Some(2.5);
        let high = resolve(&raw).unwrap();

        let low_mean = simulate(&low, 7, 4000, Count::MAX).summary().cumulative_infected.overall.last().unwrap().0;
        let high_mean = simulate(&high, 7, 4000, Count::MAX).summary().cumulative_infected.overall.last().unwrap().0;
        assert!(high_mean > low_mean, "low={low_mean} high={high_mean}");
    }

    #[test]
    fn extinction_sanity_regression() {
        let raw = RawParams {
            tbar: Some(5.0),
            kappa: Some(f64::INFINITY),
            g_ave: Some(3.0),
            r0: Some(0.5),
            pinf: Some(1.0),
            group: GroupDist::LogPlus1,
            tmax: Some(100.0),
            nstart: Some(1),
            ..Default::default()
        };
        let params = resolve(&raw).unwrap();
        let stats = simulate(&params, 42, 50_000, Count::MAX);
        assert!(stats.summary().p_extinct.0 > 0.99, "got {}", stats.summary().p_extinct.0);
    }

    // Seed scenarios S1-S5 (see spec §8) omit `pinf` from their stated
    // parameter lists; the resolver requires it explicitly rather than
    // defaulting it, so these tests supply `pinf = 1.0` (full
    // susceptibility) as the natural reading of an unstated value. S3 and
    // S5 additionally omit the group-size shape; these supply `p = 0.1` to
    // match S1's convention.

    fn s1_params() -> ModelParams {
        let raw = RawParams {
            r0: Some(1.5),
            tbar: Some(5.0),
            kappa: Some(f64::INFINITY),
            p: Some(0.1),
            pinf: Some(1.0),
            tmax: Some(30.0),
            nstart: Some(1),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn s1_extinction_probability_in_range() {
        let params = s1_params();
        let p_e = simulate(&params, 42, 10_000, Count::MAX).summary().p_extinct.0;
        assert!((0.55..=0.75).contains(&p_e), "got {p_e}");
    }

    fn s2_params() -> ModelParams {
        let raw = RawParams {
            r0: Some(0.8),
            tbar: Some(4.0),
            kappa: Some(3.0),
            p: Some(0.2),
            pinf: Some(1.0),
            tmax: Some(50.0),
            nstart: Some(5),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn s2_extinction_probability_is_high() {
        let params = s2_params();
        let p_e = simulate(&params, 42, 10_000, Count::MAX).summary().p_extinct.0;
        assert!(p_e > 0.95, "got {p_e}");
    }

    fn s3_params() -> ModelParams {
        let raw = RawParams {
            r0: Some(3.0),
            tbar: Some(5.0),
            kappa: Some(2.0),
            p: Some(0.1),
            pinf: Some(1.0),
            q: Some(0.3),
            mbar: Some(2.0),
            kappaq: Some(2.0),
            lbar: Some(2.0),
            kappal: Some(5.0),
            tmax: Some(20.0),
            nstart: Some(1),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn s3_mean_cumulative_infections_exceeds_fifty() {
        let params = s3_params();
        let mean = simulate(&params, 42, 5_000, Count::MAX)
            .summary()
            .cumulative_infected
            .overall
            .last()
            .unwrap()
            .0;
        assert!(mean > 50.0, "got {mean}");
    }

    #[test]
    fn s4_resolved_group_shape_is_stable_across_repeated_resolves() {
        let raw = RawParams {
            group: GroupDist::Gauss,
            mu: Some(6.0),
            sigma: Some(2.0),
            pinf: Some(0.2),
            r0: Some(2.0),
            tbar: Some(4.0),
            tmax: Some(20.0),
            nstart: Some(1),
            ..Default::default()
        };
        let first = resolve(&raw).unwrap();
        let second = resolve(&raw).unwrap();
        assert_eq!(first.g_ave.to_bits(), second.g_ave.to_bits());
        assert_eq!(first.lambda.to_bits(), second.lambda.to_bits());
    }

    #[test]
    fn s5_nimax_flags_bias_and_lowers_extinction_estimate() {
        let params = s3_params();
        let baseline = simulate(&params, 42, 5_000, Count::MAX);
        let capped = simulate(&params, 42, 5_000, 1000);
        assert!(capped.summary().nimax_reached);
        assert!(capped.summary().p_extinct.0 < baseline.summary().p_extinct.0);
    }
}
