//! Error taxonomy for parameter resolution and CLI/config parsing.
//!
//! Hand-rolled `Display`/`Error` impls rather than a derive macro crate.

use std::fmt;

/// A resolver root-find target, used to label `ResolveError::RootFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    LogPFromMu,
    TruncLogPFromMean,
    GammaX95,
    GammaKappa,
    GaussMu,
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LogPFromMu => "log_p_from_mu",
            Self::TruncLogPFromMean => "trunc_log_p_from_mean",
            Self::GammaX95 => "gamma_x95",
            Self::GammaKappa => "gamma_kappa",
            Self::GaussMu => "gauss_mu",
        };
        write!(f, "{s}")
    }
}

/// Errors raised while filling in a sparse `ModelParams`.
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// Fewer than the required number of inputs were given for `group`.
    Underdetermined { group: &'static str },
    /// More than one of a mutually exclusive pair was given for `group`.
    Overdetermined { group: &'static str },
    /// `name` holds `value`, which falls outside its valid range.
    OutOfRange { name: &'static str, value: f64 },
    /// A Newton/secant solve of `kind` failed to converge; `residual` is the
    /// last computed residual before giving up.
    RootFailed { kind: RootKind, residual: f64 },
    /// A post-resolve invariant failed; `code` identifies which one.
    ValidationFailed { code: &'static str, detail: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underdetermined { group } => {
                write!(f, "underdetermined parameter group: {group}")
            }
            Self::Overdetermined { group } => {
                write!(f, "overdetermined parameter group: {group}")
            }
            Self::OutOfRange { name, value } => {
                write!(f, "parameter {name} = {value} is out of range")
            }
            Self::RootFailed { kind, residual } => {
                write!(f, "root-find {kind} failed to converge (residual = {residual})")
            }
            Self::ValidationFailed { code, detail } => {
                write!(f, "validation failed ({code}): {detail}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Errors raised while tokenizing CLI arguments or config files.
#[derive(Debug, Clone)]
pub enum ConfigError {
    Parse { file: String, line: usize, message: String },
    Io { file: String, message: String },
    UnknownOption { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { file, line, message } => {
                write!(f, "{file}:{line}: {message}")
            }
            Self::Io { file, message } => write!(f, "{file}: {message}"),
            Self::UnknownOption { name } => write!(f, "unknown option '{name}'"),
        }
    }
}

impl std::error::Error for ConfigError {}
