//! Event sampler.
//!
//! One communicable period produces a Poisson-distributed number of
//! transmission events, each with a uniformly placed time, a group size
//! drawn from the resolved group-size distribution, and a binomial (or
//! saturated) infection count among attendees.

use crate::core::Time;
use crate::params::{GroupDist, ModelParams};
use crate::rng::Substream;

/// One transmission event within a communicable period.
#[derive(Debug, Clone, Copy)]
pub struct EventSample {
    pub event_time: Time,
    pub n_attendees: u32,
    pub n_infections: u32,
}

fn draw_group_size<S: Substream + ?Sized>(group: GroupDist, params: &ModelParams, rng: &mut S) -> u32 {
    match group {
        GroupDist::LogPlus1 => 1 + rng.log_finite(params.p) as u32,
        GroupDist::Log => rng.log_finite_gt1(params.p) as u32,
        GroupDist::Geom => 2 + rng.geometric(1.0 - params.p) as u32,
        GroupDist::Gauss => {
            let sigma = params.sigma.unwrap_or(1.0);
            loop {
                let x = (params.mu + sigma * rng.gaussian()).round();
                if x >= 2.0 {
                    break x as u32;
                }
            }
        }
    }
}

/// Samples all transmission events for one communicable period of duration
/// `comm_period` ending at `end_comm_period`.
pub fn sample_events<S: Substream + ?Sized>(
    params: &ModelParams,
    comm_period: Time,
    end_comm_period: Time,
    rng: &mut S,
) -> Vec<EventSample> {
    let n_events = rng.poisson(params.lambda * comm_period);
    let start = end_comm_period - comm_period;
    (0..n_events)
        .map(|_| {
            let event_time = start + rng.next_f64() * comm_period;
            let n_attendees = draw_group_size(params.group, params, rng);
            let n_infections = if params.pinf >= 1.0 {
                n_attendees - 1
            } else {
                rng.binomial((n_attendees - 1) as u64, params.pinf) as u32
            };
            EventSample { event_time, n_attendees, n_infections }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{resolve, GroupDist, RawParams};
    use crate::rng::RngStream;

    fn params_with_pinf_one() -> ModelParams {
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
    fn attendee_count_is_always_at_least_two() {
        let params = params_with_pinf_one();
        let mut rng = RngStream::split(5, 0);
        for _ in 0..500 {
            let events = sample_events(&params, 5.0, 5.0, &mut rng);
            for e in events {
                assert!(e.n_attendees >= 2);
            }
        }
    }

    #[test]
    fn saturated_pinf_infects_every_other_attendee() {
        let params = params_with_pinf_one();
        let mut rng = RngStream::split(6, 0);
        let events = sample_events(&params, 5.0, 5.0, &mut rng);
        for e in events {
            assert_eq!(e.n_infections, e.n_attendees - 1);
        }
    }

    #[test]
    fn event_times_fall_within_the_communicable_window() {
        let params = params_with_pinf_one();
        let mut rng = RngStream::split(7, 0);
        let events = sample_events(&params, 5.0, 12.0, &mut rng);
        for e in events {
            assert!(e.event_time >= 7.0 && e.event_time <= 12.0);
        }
    }
}
