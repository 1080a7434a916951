#![warn(missing_docs)]
//! trialrun Core - Experiment Model and Lifecycle Contracts
//!
//! This crate provides the domain model for the trialrun experiment
//! sequencer:
//! - `ExperimentConfig` and its pure validator
//! - Run plan expansion (treatments × repetitions → ordered run table)
//! - The process-wide `OutputPathRegistry` consulted by artifact writers
//! - The `RunPhases` lifecycle contract and per-run `RunContext`
//! - Outcome records and the typed error taxonomy

mod config;
mod error;
mod outcome;
mod output;
mod phase;
mod plan;
mod validate;

pub use config::{DEFAULT_OUTPUT_ROOT, ExperimentConfig, Factor, Treatment};
pub use error::{ConfigError, EngineError, PhaseError, PlanError};
pub use outcome::{
    ExperimentOutcome, ExperimentStatus, FailureDetail, FailureKind, RunOutcome, RunStatus,
};
pub use output::OutputPathRegistry;
pub use phase::{NoopPhases, Phase, RunContext, RunPhases, invoke};
pub use plan::{RunDescriptor, RunTable, build_plan};
pub use validate::validate;
