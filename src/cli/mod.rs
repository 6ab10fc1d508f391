//! CLI / config-file option parsing.
//!
//! Hand-written recursive-descent tokenizer rather than `clap`: the config
//! grammar (`#` comments, quote-grouping, `=`/`:` as whitespace, recursive
//! `config FILE` inclusion) has no idiomatic `derive(Parser)` expression.

mod tokenize;

use std::fs;
use std::path::Path;

use crate::core::{Count, DEFAULT_NIMAX, DEFAULT_NPATHS, DEFAULT_NSTART};
use crate::error::ConfigError;
use crate::params::{GroupDist, RawParams};

pub use tokenize::tokenize;

/// Run-level options that sit alongside `RawParams`: how many paths to
/// simulate, the `nimax` circuit breaker, worker count, and stdout/stderr
/// redirection.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub npaths: u64,
    pub nimax: Count,
    pub jobs: usize,
    pub seed: u64,
    pub olog: Option<String>,
    pub elog: Option<String>,
    pub help: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            npaths: DEFAULT_NPATHS,
            nimax: DEFAULT_NIMAX,
            jobs: num_cpus::get(),
            seed: 42,
            olog: None,
            elog: None,
            help: false,
        }
    }
}

/// Parses CLI arguments (leading dashes optional, `--config FILE` expanded
/// recursively) into a sparse [`RawParams`] plus [`RunOptions`].
pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<(RawParams, RunOptions), ConfigError> {
    let mut queue: std::collections::VecDeque<String> = args.into_iter().collect();
    let mut raw = RawParams::default();
    let mut run = RunOptions::default();

    while let Some(token) = queue.pop_front() {
        let name = token.trim_start_matches('-');
        if name == "help" {
            run.help = true;
            continue;
        }
        if name == "config" {
            let file = queue.pop_front().ok_or_else(|| ConfigError::Parse {
                file: "<args>".into(),
                line: 0,
                message: "config requires a file argument".into(),
            })?;
            let contents = fs::read_to_string(&file)
                .map_err(|e| ConfigError::Io { file: file.clone(), message: e.to_string() })?;
            for tok in tokenize(&contents).into_iter().rev() {
                queue.push_front(tok);
            }
            continue;
        }

        let value = queue.pop_front().ok_or_else(|| ConfigError::Parse {
            file: "<args>".into(),
            line: 0,
            message: format!("option '{name}' requires a value"),
        })?;

        apply_option(&mut raw, &mut run, name, &value)?;
    }

    Ok((raw, run))
}

fn parse_f64(name: &str, value: &str) -> Result<f64, ConfigError> {
    if value.eq_ignore_ascii_case("inf") || value.eq_ignore_ascii_case("infinity") {
        return Ok(f64::INFINITY);
    }
    value.parse().map_err(|_| ConfigError::Parse {
        file: "<args>".into(),
        line: 0,
        message: format!("'{name}' expects a number, got '{value}'"),
    })
}

fn parse_count(name: &str, value: &str) -> Result<Count, ConfigError> {
    value.parse().map_err(|_| ConfigError::Parse {
        file: "<args>".into(),
        line: 0,
        message: format!("'{name}' expects a non-negative integer, got '{value}'"),
    })
}

fn apply_option(raw: &mut RawParams, run: &mut RunOptions, name: &str, value: &str) -> Result<(), ConfigError> {
    match name {
        "tbar" => raw.tbar = Some(parse_f64(name, value)?),
        "p" => raw.p = Some(parse_f64(name, value)?),
        "lambda" => raw.lambda = Some(parse_f64(name, value)?),
        "lambda_uncut" => raw.lambda_uncut = Some(parse_f64(name, value)?),
        "kappa" => raw.kappa = Some(parse_f64(name, value)?),
        "t95" => raw.t95 = Some(parse_f64(name, value)?),

        "lbar" => raw.lbar = Some(parse_f64(name, value)?),
        "kappal" => raw.kappal = Some(parse_f64(name, value)?),
        "l95" => raw.l95 = Some(parse_f64(name, value)?),

        "q" => raw.q = Some(parse_f64(name, value)?),
        "mbar" => raw.mbar = Some(parse_f64(name, value)?),
        "kappaq" => raw.kappaq = Some(parse_f64(name, value)?),
        "m95" => raw.m95 = Some(parse_f64(name, value)?),

        "R0" | "r0" => raw.r0 = Some(parse_f64(name, value)?),
        "mu" => raw.mu = Some(parse_f64(name, value)?),
        "pinf" => raw.pinf = Some(parse_f64(name, value)?),
        "g_ave" => raw.g_ave = Some(parse_f64(name, value)?),
        "sigma" => raw.sigma = Some(parse_f64(name, value)?),
        "rsigma" => raw.rsigma = Some(parse_f64(name, value)?),

        "pit" => raw.pit = Some(parse_f64(name, value)?),
        "itbar" => raw.itbar = Some(parse_f64(name, value)?),
        "kappait" => raw.kappait = Some(parse_f64(name, value)?),
        "it95" => raw.it95 = Some(parse_f64(name, value)?),

        "pim" => raw.pim = Some(parse_f64(name, value)?),
        "imbar" => raw.imbar = Some(parse_f64(name, value)?),
        "kappaim" => raw.kappaim = Some(parse_f64(name, value)?),
        "im95" => raw.im95 = Some(parse_f64(name, value)?),

        "group" => {
            raw.group = match value {
                "log_plus_1" => GroupDist::LogPlus1,
                "log" => GroupDist::Log,
                "geom" => GroupDist::Geom,
                "gauss" => GroupDist::Gauss,
                other => {
                    return Err(ConfigError::Parse {
                        file: "<args>".into(),
                        line: 0,
                        message: format!("unknown group distribution '{other}'"),
                    })
                }
            }
        }
        "group_interactions" => raw.group_interactions = parse_bool(value),

        "tmax" => raw.tmax = Some(parse_f64(name, value)?),
        "nstart" => raw.nstart = Some(parse_count(name, value)?),

        "npaths" => run.npaths = value.parse().unwrap_or(DEFAULT_NPATHS),
        "nimax" => run.nimax = parse_count(name, value)?,
        "jobs" => run.jobs = value.parse().unwrap_or(run.jobs),
        "seed" => run.seed = value.parse().unwrap_or(run.seed),
        "olog" => run.olog = Some(value.to_string()),
        "elog" => run.elog = Some(value.to_string()),

        other => {
            return Err(ConfigError::UnknownOption { name: other.to_string() });
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}

/// `nstart` defaults to `1` when not overridden.
pub fn default_nstart() -> Count {
    DEFAULT_NSTART
}

pub fn basename(path: &str) -> &str {
    Path::new(path).file_name().and_then(|s| s.to_str()).unwrap_or(path)
}
