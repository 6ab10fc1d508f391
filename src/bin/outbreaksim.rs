//! `outbreaksim`: CLI entry point wiring option parsing, parameter
//! resolution, the branching engine, and stats reporting together.

use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};

use outbreak_mc::cli::{self, RunOptions};
use outbreak_mc::params::{resolve, ModelParams};
use outbreak_mc::sim::simulate_parallel;
use outbreak_mc::stats::{BinTriple, Summary};

fn init_logging(run: &RunOptions) -> Result<()> {
    match &run.elog {
        None => {
            let _ = TermLogger::init(LevelFilter::Warn, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
        }
        Some(path) => {
            let file = File::create(path).with_context(|| format!("opening elog file {path}"))?;
            let _ = WriteLogger::init(LevelFilter::Warn, Config::default(), file);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("outbreaksim: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Where the human-readable report goes: a real stdout handle or a
/// redirected `olog` file.
fn open_output(run: &RunOptions) -> Result<Box<dyn Write>> {
    match &run.olog {
        None => Ok(Box::new(io::stdout())),
        Some(path) => {
            let file = File::create(path).with_context(|| format!("opening olog file {path}"))?;
            Ok(Box::new(file))
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (raw, run_opts) = cli::parse(args).context("parsing command-line options")?;
    init_logging(&run_opts)?;

    let mut out = open_output(&run_opts)?;

    if run_opts.help {
        print_usage(&mut out)?;
        return Ok(());
    }

    let params = resolve(&raw).context("resolving model parameters")?;
    print_resolved_params(&mut out, &params)?;

    let stats = simulate_parallel(&params, run_opts.seed, run_opts.npaths, run_opts.nimax, run_opts.jobs);
    let summary = stats.summary();
    print_summary(&mut out, &summary)?;

    Ok(())
}

fn print_usage(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "usage: outbreaksim [--option value ...] [--config FILE]")?;
    writeln!(out)?;
    writeln!(out, "Reproduction / period parameters: tbar p lambda lambda_uncut kappa t95")?;
    writeln!(out, "Latent period:                    lbar kappal l95")?;
    writeln!(out, "Alternate period (prob. q):       q mbar kappaq m95")?;
    writeln!(out, "Derived reproduction parameters:  R0 mu pinf")?;
    writeln!(out, "Group-size distribution:          g_ave sigma rsigma group group_interactions")?;
    writeln!(out, "Interrupted periods:              pit itbar kappait it95 pim imbar kappaim im95")?;
    writeln!(out, "Horizon / primaries:              tmax nstart")?;
    writeln!(out, "Run control:                      npaths nimax jobs seed config olog elog help")?;
    Ok(())
}

fn print_resolved_params(out: &mut dyn Write, p: &ModelParams) -> Result<()> {
    writeln!(out, "Resolved parameters:")?;
    let rows: [(&str, f64); 9] = [
        ("R0", p.r0),
        ("lambda", p.lambda),
        ("lambda_uncut", p.lambda_uncut),
        ("tbar", p.tbar),
        ("pinf", p.pinf),
        ("mu", p.mu),
        ("p", p.p),
        ("g_ave", p.g_ave),
        ("g_ave_transm", p.g_ave_transm),
    ];
    for (name, value) in rows {
        writeln!(out, "{name:>16} = {value:22.15e}")?;
    }
    writeln!(out)?;
    Ok(())
}

fn print_summary(out: &mut dyn Write, summary: &Summary) -> Result<()> {
    writeln!(out, "Mean R is {:.6}", summary.mean_r)?;
    writeln!(out, "Communicable period is {:.6}", summary.mean_commper)?;

    let (p_mean, p_std) = summary.p_extinct;
    let flag = if summary.nimax_reached { " (nimax reached, could be biased)" } else { "" };
    writeln!(out, "Probability of extinction and its statistical uncertainty: {p_mean:.6} +/- {p_std:.6}{flag}")?;

    let (t_mean, t_std) = summary.extinction_time;
    writeln!(out, "Extinction time, if it occurs is {t_mean:.6} +/- {t_std:.6}")?;
    writeln!(out)?;

    print_bin_table(out, "Current infectious", &summary.current_infectious)?;
    print_bin_table(out, "Cumulative infected", &summary.cumulative_infected)?;
    Ok(())
}

fn print_bin_table(out: &mut dyn Write, title: &str, triple: &BinTriple) -> Result<()> {
    writeln!(out, "{title}:")?;
    writeln!(out, "{:>6} {:>22} {:>22} {:>22}", "bin", "extinction", "no_extinction", "overall")?;
    let n_bins = triple.overall.len();
    for bin in 0..n_bins {
        let (em, es) = triple.extinction[bin];
        let (nm, ns) = triple.no_extinction[bin];
        let (om, os) = triple.overall[bin];
        writeln!(
            out,
            "{bin:>6} {em:>10.4} +/- {es:<9.4} {nm:>10.4} +/- {ns:<9.4} {om:>10.4} +/- {os:<9.4}"
        )?;
    }
    writeln!(out)?;
    Ok(())
}
