//! Stats accumulator.
//!
//! Implements [`PathObserver`](crate::engine::PathObserver) to turn the
//! engine's callback stream into per-time-bin mean/standard-deviation
//! series, split by extinction outcome. The variance formula
//! (`N/(N-1) * (sum²/N - mean²)`) is kept rather than replaced by a
//! numerically steadier one-pass algorithm: downstream test vectors are
//! computed against this exact formula.

use crate::core::{Count, Time};
use crate::engine::{Frame, PathObserver, PathOutcome};
use crate::event::EventSample;
use crate::params::ModelParams;

/// Running sum / sum-of-squares accumulator for one per-bin series,
/// folding in one path's contribution at a time.
#[derive(Debug, Clone)]
pub struct BinAccumulator {
    sum: Vec<f64>,
    sumsq: Vec<f64>,
    n: u64,
}

impl BinAccumulator {
    fn new(n_bins: usize) -> Self {
        Self { sum: vec![0.0; n_bins], sumsq: vec![0.0; n_bins], n: 0 }
    }

    fn fold(&mut self, per_bin: &[f64]) {
        for (bin, &x) in self.sum.iter_mut().zip(per_bin) {
            *bin += x;
        }
        for (bin, &x) in self.sumsq.iter_mut().zip(per_bin) {
            *bin += x * x;
        }
        self.n += 1;
    }

    fn merge(&mut self, other: &BinAccumulator) {
        for (a, b) in self.sum.iter_mut().zip(&other.sum) {
            *a += b;
        }
        for (a, b) in self.sumsq.iter_mut().zip(&other.sumsq) {
            *a += b;
        }
        self.n += other.n;
    }

    /// Sum across all bins of all folded-in values.
    pub fn total(&self) -> f64 {
        self.sum.iter().sum()
    }

    /// `(mean, std)` per bin; `std` is `0.0` when fewer than two samples
    /// were folded in.
    pub fn mean_std(&self) -> Vec<(f64, f64)> {
        let n = self.n as f64;
        self.sum
            .iter()
            .zip(&self.sumsq)
            .map(|(&sum, &sumsq)| {
                if self.n == 0 {
                    return (0.0, 0.0);
                }
                let mean = sum / n;
                let variance = if self.n > 1 {
                    (n / (n - 1.0)) * (sumsq / n - mean * mean)
                } else {
                    0.0
                };
                (mean, variance.max(0.0).sqrt())
            })
            .collect()
    }
}

/// Scalar running mean/std over a stream of per-path values (e.g.
/// extinction time), using the same Welford-less formula as
/// [`BinAccumulator`].
#[derive(Debug, Clone, Default)]
pub struct ScalarAccumulator {
    sum: f64,
    sumsq: f64,
    n: u64,
}

impl ScalarAccumulator {
    fn add(&mut self, x: f64) {
        self.sum += x;
        self.sumsq += x * x;
        self.n += 1;
    }

    fn merge(&mut self, other: &ScalarAccumulator) {
        self.sum += other.sum;
        self.sumsq += other.sumsq;
        self.n += other.n;
    }

    pub fn mean_std(&self) -> (f64, f64) {
        if self.n == 0 {
            return (0.0, 0.0);
        }
        let n = self.n as f64;
        let mean = self.sum / n;
        let variance = if self.n > 1 { (n / (n - 1.0)) * (self.sumsq / n - mean * mean) } else { 0.0 };
        (mean, variance.max(0.0).sqrt())
    }
}

/// Final, caller-facing summary produced by [`StatsAccumulator::summary`].
pub struct Summary {
    pub n_paths: u64,
    pub mean_r: f64,
    pub mean_commper: f64,
    pub mean_events: f64,
    pub p_extinct: (f64, f64),
    pub nimax_reached: bool,
    pub extinction_time: (f64, f64),
    pub current_infectious: BinTriple,
    pub cumulative_infected: BinTriple,
}

/// The three columns of each per-bin table: paths that went extinct, paths
/// that didn't, and the pooled total.
pub struct BinTriple {
    pub extinction: Vec<(f64, f64)>,
    pub no_extinction: Vec<(f64, f64)>,
    pub overall: Vec<(f64, f64)>,
}

/// Drives the branching engine and accumulates per-path, per-bin series.
pub struct StatsAccumulator {
    n_bins: usize,
    nimax: Count,
    tmax: Time,

    // Per-path transient state, cleared at the start of each path.
    cur_infectious: Vec<f64>,
    new_infections: Vec<f64>,
    any_truncated: bool,
    maxed: bool,
    max_end_comm: Time,

    // Running totals, accumulated directly (not folded per-path).
    total_r_sum: f64,
    total_commper_sum: f64,
    total_nevents_sum: f64,
    total_frames: u64,

    n_paths: u64,
    n_extinct: u64,
    any_path_maxed: bool,
    extinction_time: ScalarAccumulator,

    cur_extinct: BinAccumulator,
    cur_nonextinct: BinAccumulator,
    cur_overall: BinAccumulator,
    cum_extinct: BinAccumulator,
    cum_nonextinct: BinAccumulator,
    cum_overall: BinAccumulator,
}

impl StatsAccumulator {
    pub fn new(params: &ModelParams, nimax: Count) -> Self {
        let n_bins = if params.tmax.is_finite() { params.tmax.floor() as usize + 1 } else { 1 };
        Self {
            n_bins,
            nimax,
            tmax: params.tmax,
            cur_infectious: vec![0.0; n_bins],
            new_infections: vec![0.0; n_bins],
            any_truncated: false,
            maxed: false,
            max_end_comm: 0.0,
            total_r_sum: 0.0,
            total_commper_sum: 0.0,
            total_nevents_sum: 0.0,
            total_frames: 0,
            n_paths: 0,
            n_extinct: 0,
            any_path_maxed: false,
            extinction_time: ScalarAccumulator::default(),
            cur_extinct: BinAccumulator::new(n_bins),
            cur_nonextinct: BinAccumulator::new(n_bins),
            cur_overall: BinAccumulator::new(n_bins),
            cum_extinct: BinAccumulator::new(n_bins),
            cum_nonextinct: BinAccumulator::new(n_bins),
            cum_overall: BinAccumulator::new(n_bins),
        }
    }

    /// Total infectious frames created across every path folded in so far
    /// (primaries and onward infections alike).
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Total new-infection count across every bin and every path folded in
    /// so far. Equal to `total_frames() - nstart * n_paths` once a path has
    /// fully completed, since every frame but a primary's is created by
    /// exactly one counted infection.
    pub fn total_new_infections(&self) -> f64 {
        self.cum_overall.total()
    }

    fn clamp_bin(&self, t: Time) -> usize {
        if t < 0.0 {
            0
        } else {
            (t.floor() as usize).min(self.n_bins - 1)
        }
    }

    fn note_frame(&mut self, frame: &Frame<()>) {
        self.total_frames += 1;
        if frame.period.truncated_by_tmax {
            self.any_truncated = true;
        }
        self.max_end_comm = self.max_end_comm.max(frame.period.end_comm_period);

        let lo = self.clamp_bin(frame.parent_event_time);
        let hi = self.clamp_bin(frame.period.end_comm_period);
        for bin in lo..=hi {
            self.cur_infectious[bin] += 1.0;
        }

        let frame_r: f64 = frame.events.iter().map(|e| e.n_infections as f64).sum();
        self.total_r_sum += frame_r;
        self.total_commper_sum += frame.period.comm_period;
        self.total_nevents_sum += frame.events.len() as f64;
    }

    pub fn summary(&self) -> Summary {
        let (p_mean, p_std) = {
            let n = self.n_paths as f64;
            let p = if n > 0.0 { self.n_extinct as f64 / n } else { 0.0 };
            let var = if n > 1.0 { p * (1.0 - p) / (n - 1.0) } else { 0.0 };
            (p, var.max(0.0).sqrt())
        };
        Summary {
            n_paths: self.n_paths,
            mean_r: if self.total_frames > 0 { self.total_r_sum / self.total_frames as f64 } else { 0.0 },
            mean_commper: if self.total_frames > 0 {
                self.total_commper_sum / self.total_frames as f64
            } else {
                0.0
            },
            mean_events: if self.total_frames > 0 {
                self.total_nevents_sum / self.total_frames as f64
            } else {
                0.0
            },
            p_extinct: (p_mean, p_std),
            nimax_reached: self.any_path_maxed,
            extinction_time: self.extinction_time.mean_std(),
            current_infectious: BinTriple {
                extinction: self.cur_extinct.mean_std(),
                no_extinction: self.cur_nonextinct.mean_std(),
                overall: self.cur_overall.mean_std(),
            },
            cumulative_infected: BinTriple {
                extinction: self.cum_extinct.mean_std(),
                no_extinction: self.cum_nonextinct.mean_std(),
                overall: self.cum_overall.mean_std(),
            },
        }
    }

    /// Folds another thread's accumulator into this one.
    pub fn merge(&mut self, other: StatsAccumulator) {
        self.total_r_sum += other.total_r_sum;
        self.total_commper_sum += other.total_commper_sum;
        self.total_nevents_sum += other.total_nevents_sum;
        self.total_frames += other.total_frames;
        self.n_paths += other.n_paths;
        self.n_extinct += other.n_extinct;
        self.any_path_maxed |= other.any_path_maxed;
        self.extinction_time.merge(&other.extinction_time);
        self.cur_extinct.merge(&other.cur_extinct);
        self.cur_nonextinct.merge(&other.cur_nonextinct);
        self.cur_overall.merge(&other.cur_overall);
        self.cum_extinct.merge(&other.cum_extinct);
        self.cum_nonextinct.merge(&other.cum_nonextinct);
        self.cum_overall.merge(&other.cum_overall);
    }
}

impl PathObserver for StatsAccumulator {
    type FrameData = ();

    fn on_primary_init(&mut self, _child: &Frame<()>, _parent: Option<&Frame<()>>) {}

    fn on_new_event(&mut self, _frame: &mut Frame<()>, event: EventSample) -> bool {
        if self.maxed {
            return false;
        }
        if event.event_time < self.tmax {
            let bin = self.clamp_bin(event.event_time);
            self.new_infections[bin] += event.n_infections as f64;
            if self.new_infections[bin] > self.nimax as f64 {
                self.maxed = true;
                if !self.any_path_maxed {
                    log::warn!(
                        "nimax ({}) reached in bin {bin}; extinction probability may be biased",
                        self.nimax
                    );
                }
                self.any_path_maxed = true;
                return false;
            }
        }
        true
    }

    fn on_infectious_noevent(&mut self, frame: &Frame<()>, _parent: Option<&Frame<()>>) {
        self.note_frame(frame);
    }

    fn on_infectious_done(&mut self, frame: &Frame<()>, _parent: Option<&Frame<()>>) {
        self.note_frame(frame);
    }

    fn on_layers_grown(&mut self, _new_frames: &mut [Frame<()>]) {}

    fn on_path_end(&mut self) -> PathOutcome {
        let extinct = !self.any_truncated && !self.maxed;

        self.cur_overall.fold(&self.cur_infectious);
        self.cum_overall.fold(&self.new_infections);
        if extinct {
            self.cur_extinct.fold(&self.cur_infectious);
            self.cum_extinct.fold(&self.new_infections);
            self.n_extinct += 1;
            self.extinction_time.add(self.max_end_comm);
        } else {
            self.cur_nonextinct.fold(&self.cur_infectious);
            self.cum_nonextinct.fold(&self.new_infections);
        }
        self.n_paths += 1;

        self.cur_infectious.iter_mut().for_each(|x| *x = 0.0);
        self.new_infections.iter_mut().for_each(|x| *x = 0.0);
        self.any_truncated = false;
        self.maxed = false;
        self.max_end_comm = 0.0;

        PathOutcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::params::{resolve, GroupDist, RawParams};
    use crate::rng::RngStream;

    fn sub_critical_params() -> ModelParams {
        let raw = RawParams {
            tbar: Some(5.0),
            kappa: Some(f64::INFINITY),
            g_ave: Some(3.0),
            r0: Some(0.5),
            pinf: Some(1.0),
            group: GroupDist::LogPlus1,
            tmax: Some(30.0),
            nstart: Some(1),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn sub_critical_outbreaks_mostly_go_extinct() {
        let params = sub_critical_params();
        let mut rng = RngStream::split(42, 0);
        let mut engine: Engine<StatsAccumulator> = Engine::new();
        let mut stats = StatsAccumulator::new(&params, Count::MAX);
        for _ in 0..2000 {
            engine.run_path(&params, &mut rng, &mut stats);
        }
        let summary = stats.summary();
        assert!(summary.p_extinct.0 > 0.9, "got {}", summary.p_extinct.0);
    }

    #[test]
    fn bin_accumulator_matches_hand_computed_variance() {
        let mut acc = BinAccumulator::new(1);
        acc.fold(&[1.0]);
        acc.fold(&[3.0]);
        acc.fold(&[5.0]);
        let (mean, std) = acc.mean_std()[0];
        assert!((mean - 3.0).abs() < 1e-9);
        assert!(std > 0.0);
    }
}
