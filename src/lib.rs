//! Monte Carlo branching-process simulator for transmissible pathogen
//! spread through an infinite population (no spatial structure, no
//! contact network, no age stratification).
//!
//! Dependency-ordered modules mirror the component table: [`rng`] (A),
//! [`rootfind`] (B), [`params`] (C), [`period`] (D), [`event`] (E),
//! [`engine`] (F), [`stats`] (G), with [`sim`] wiring F+G together for
//! single- and multi-threaded dispatch, and [`cli`] handling option/config
//! parsing for the `outbreaksim` binary.

pub mod cli;
pub mod core;
pub mod engine;
pub mod error;
pub mod event;
pub mod params;
pub mod period;
pub mod rng;
pub mod rootfind;
pub mod sim;
pub mod stats;
