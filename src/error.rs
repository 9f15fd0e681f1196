// src/error.rs
//
// Error types for the solver core and its output collaborators.

use std::path::PathBuf;

/// Errors raised by the field simulator.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Construction parameters violate the simulator contract.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A caller asked to advance a timestep other than the next one.
    #[error("out-of-order step: simulator is at t={expected}, caller requested t={got}")]
    OutOfOrderStep {
        /// Timestep the simulator will run next.
        expected: u64,
        /// Timestep the caller asked for.
        got: u64,
    },

    /// Sample queried before the first step ran.
    #[error("no step has been taken yet")]
    NoStepTaken,
}

/// Errors raised while persisting, reading back or rendering samples.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialise config: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed row in a persisted CSV table.
    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error(transparent)]
    Sim(#[from] SimError),
}

impl OutputError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
