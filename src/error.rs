use std::path::PathBuf;

use thiserror::Error;

use crate::mdp::Action;

/// Errors raised while configuring, loading or solving the thermostat MDP.
///
/// Every variant is fatal: configuration and table problems are reported
/// before the first sweep runs, and nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("desired temperature {0} is not on the ladder 16.0..=25.0 in steps of 0.5")]
    TemperatureOffLadder(f64),

    #[error("cost of action {action} must be a finite real number, got {value}")]
    InvalidCost { action: Action, value: f64 },

    #[error("cycle bound must be a positive integer or \"unbounded\", got {0:?}")]
    InvalidCycleBound(String),

    #[error("malformed transition table at line {line}: {message}")]
    MalformedTable { line: usize, message: String },

    #[error("transition tables disagree on state count: ON has {on}, OFF has {off}")]
    StateCountMismatch { on: usize, off: usize },

    #[error("transition tables disagree on state {index}: ON has {on}, OFF has {off}")]
    StateOrderMismatch { index: usize, on: f64, off: f64 },

    #[error("desired temperature {0} does not appear in the transition tables")]
    StateNotFound(f64),

    #[error("value iteration did not converge within the safety cap of {0} sweeps")]
    SafetyCapExceeded(usize),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    ConfigFile(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Error::MalformedTable {
            line,
            message: message.into(),
        }
    }
}
