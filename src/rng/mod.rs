//! Splittable RNG substreams.
//!
//! Each worker thread owns exactly one [`RngStream`]; substreams never
//! coordinate, so two callers reading the same substream observe the same
//! ordered sequence of draws.

mod logarithmic;
mod stream;

pub use logarithmic::{log_finite, log_finite_gt1};
pub use stream::{RngStream, Substream};
