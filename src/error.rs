//! Error types shared by the distributor, the schedulers and the I/O layer.

use std::io;

use thiserror::Error;

/// A task-table row whose time range or counts cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed task row \"{input}\": {reason}")]
pub struct FormatError {
    /// The offending raw input (time range string or count).
    pub input: String,
    /// Human-readable reason.
    pub reason: String,
}

impl FormatError {
    pub(crate) fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error returned by scheduling runs and loaders.
#[derive(Debug, Error)]
pub enum SchedError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A profile value is negative or not finite.
    #[error("invalid profile value at hour {hour}: {field} = {value}")]
    InvalidProfile {
        hour: usize,
        field: &'static str,
        value: f64,
    },

    /// A profile source did not cover every hour of the day exactly once.
    #[error("profile is missing or duplicates hour {hour}")]
    IncompleteProfile { hour: usize },

    /// The optimal model produced no usable solution.
    #[error("optimal model has no feasible solution: {reason}")]
    InfeasibleModel { reason: String },

    /// Green consumption in an hour exceeds its supply.
    #[error("green usage {used:.4} exceeds supply {supply:.4} at hour {hour}")]
    CapacityExceeded { hour: usize, used: f64, supply: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
