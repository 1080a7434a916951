//! Typed Error Taxonomy
//!
//! Every fallible operation in the engine returns one of these kinds, and
//! the top-level dispatcher chooses between a short user-facing message
//! (classified errors) and a full diagnostic trace (anything else).
//!
//! Propagation policy:
//! - [`ConfigError`] and [`PlanError`] abort the whole experiment before
//!   any run starts.
//! - [`PhaseError`] is scoped to the run whose phase raised it; the
//!   controller records it and continues with the next run.

use std::path::PathBuf;
use thiserror::Error;

/// A structural or semantic defect in an [`crate::ExperimentConfig`].
///
/// Returned by [`crate::validate`]; repetition cannot help, so the
/// experiment aborts before any run is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required part of the configuration is missing or malformed.
    #[error("invalid experiment shape: {field}: {detail}")]
    Shape {
        /// Configuration field the check failed on
        field: &'static str,
        /// What was wrong with it
        detail: String,
    },

    /// A treatment references a factor that is not declared.
    #[error("treatment '{treatment}' references undeclared factor '{factor}'")]
    UnknownFactor {
        /// Offending treatment name
        treatment: String,
        /// Referenced factor name
        factor: String,
    },

    /// A treatment selects a level its factor does not declare.
    #[error("treatment '{treatment}' references undeclared level '{level}' of factor '{factor}'")]
    UnknownLevel {
        /// Offending treatment name
        treatment: String,
        /// Referenced factor name
        factor: String,
        /// Referenced level
        level: String,
    },

    /// A numeric field is outside its allowed range.
    #[error("invalid value for {field}: {value} (must be a positive integer)")]
    InvalidValue {
        /// Configuration field the check failed on
        field: &'static str,
        /// The rejected value
        value: u64,
    },
}

/// An internal invariant violation while expanding the run plan.
///
/// Distinct from [`ConfigError`]: a collision here means upstream
/// validation let a duplicate treatment name through, so it is surfaced
/// with full diagnostic detail rather than a short user message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PlanError {
    /// Two planned runs resolved to the same identifier.
    #[error("duplicate run identifier '{run_id}' in run table")]
    DuplicateRunId {
        /// The colliding identifier
        run_id: String,
    },
}

/// A failure raised by a lifecycle phase implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PhaseError {
    /// The phase reported a failure with a message.
    #[error("{0}")]
    Failed(String),

    /// The phase hit an I/O problem while producing its artifacts.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PhaseError {
    /// Build a [`PhaseError::Failed`] from any displayable message.
    pub fn msg(message: impl Into<String>) -> Self {
        PhaseError::Failed(message.into())
    }
}

/// An experiment-level failure that aborts before any run executes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Configuration validation rejected the experiment.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Run plan expansion hit an internal invariant violation.
    #[error("run plan error: {0}")]
    Plan(#[from] PlanError),

    /// The experiment output location could not be established.
    #[error("cannot prepare experiment output at {path}: {source}")]
    Prepare {
        /// Path that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },
}
