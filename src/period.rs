//! Period sampler.
//!
//! Draws the latent and communicable periods for one infectious individual
//! and derives `end_comm_period`.

use crate::core::Time;
use crate::params::{GammaSpec, ModelParams};
use crate::rng::Substream;

/// Bit flags recording how a communicable period was selected and whether
/// it was cut short.
pub mod comm_type {
    pub const MAIN: u8 = 1 << 0;
    pub const ALT: u8 = 1 << 1;
    pub const INTERRUPTED: u8 = 1 << 2;
    pub const TRUE_POSITIVE_TEST: u8 = 1 << 3;
}

/// The sampled period state for one infectious individual, ready to be
/// stored into that individual's stack frame.
#[derive(Debug, Clone, Copy)]
pub struct PeriodSample {
    pub latent_period: Time,
    pub comm_period: Time,
    pub end_comm_period: Time,
    pub commper_type: u8,
    pub truncated_by_tmax: bool,
}

fn draw_gamma<S: Substream + ?Sized>(rng: &mut S, spec: &GammaSpec) -> Time {
    if spec.is_fixed() {
        spec.ave
    } else {
        rng.gamma(spec.a, spec.b)
    }
}

/// Draws latent + communicable periods for an individual infected at
/// `parent_event_time`.
pub fn sample_period<S: Substream + ?Sized>(
    params: &ModelParams,
    parent_event_time: Time,
    rng: &mut S,
) -> PeriodSample {
    let latent_period = match &params.latent {
        None => 0.0,
        Some(spec) => draw_gamma(rng, spec),
    };

    let use_alt = params.q > 0.0 && rng.next_f64() < params.q;
    let (mut comm_period, mut commper_type) = if use_alt {
        let spec = params.alt.as_ref().expect("alt period resolved when q > 0");
        (draw_gamma(rng, spec), comm_type::ALT)
    } else {
        (draw_gamma(rng, &params.main), comm_type::MAIN)
    };

    let interrupt = if use_alt {
        params.interrupted_alt.as_ref()
    } else {
        params.interrupted_main.as_ref()
    };
    if let Some(interrupt) = interrupt {
        if interrupt.p_interrupt > 0.0 && rng.next_f64() < interrupt.p_interrupt {
            let interrupted = draw_gamma(rng, &interrupt.gamma);
            if interrupted < comm_period {
                comm_period = interrupted;
                commper_type |= comm_type::INTERRUPTED | comm_type::TRUE_POSITIVE_TEST;
            }
        }
    }

    let end_comm_period = parent_event_time + latent_period + comm_period;
    let truncated_by_tmax =
        end_comm_period > params.tmax && parent_event_time + latent_period < params.tmax;

    PeriodSample {
        latent_period,
        comm_period,
        end_comm_period,
        commper_type,
        truncated_by_tmax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{resolve, GroupDist, RawParams};
    use crate::rng::RngStream;

    fn fixed_params() -> ModelParams {
        let raw = RawParams {
            tbar: Some(5.0),
            kappa: Some(f64::INFINITY),
            g_ave: Some(4.0),
            r0: Some(2.0),
            pinf: Some(1.0),
            group: GroupDist::LogPlus1,
            tmax: Some(30.0),
            ..Default::default()
        };
        resolve(&raw).unwrap()
    }

    #[test]
    fn fixed_main_period_is_deterministic_duration() {
        let params = fixed_params();
        let mut rng = RngStream::split(1, 0);
        let sample = sample_period(&params, 0.0, &mut rng);
        assert_eq!(sample.comm_period, 5.0);
        assert_eq!(sample.commper_type & comm_type::MAIN, comm_type::MAIN);
        assert_eq!(sample.latent_period, 0.0);
    }

    #[test]
    fn truncation_flag_set_only_when_partially_observable() {
        let mut params = fixed_params();
        params.tmax = 3.0;
        let mut rng = RngStream::split(1, 0);
        let sample = sample_period(&params, 0.0, &mut rng);
        assert!(sample.truncated_by_tmax);
    }
}
