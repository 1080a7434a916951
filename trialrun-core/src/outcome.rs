//! Outcome Records
//!
//! Per-run and experiment-level results, serializable for the persisted
//! summary. Failure details are plain data (kind + phase + message), not
//! live error values, so outcomes can outlive the errors that produced
//! them.

use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Terminal status of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every phase completed
    Succeeded,
    /// The run was rejected before execution
    FailedValidation,
    /// A lifecycle phase failed or timed out
    FailedExecution,
    /// The run was never attempted
    Skipped,
}

impl RunStatus {
    /// Whether this status counts toward overall experiment success.
    pub fn is_success(self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }
}

/// Classification of a run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A lifecycle phase returned an error
    Phase,
    /// The measurement phases exceeded the per-run timeout
    Timeout,
    /// A fault the engine did not anticipate (e.g. a panicking phase)
    Unclassified,
}

/// Captured detail of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// What kind of failure this was
    pub kind: FailureKind,
    /// The phase the failure is attributed to, when known
    pub phase: Option<Phase>,
    /// Human-readable failure message
    pub message: String,
}

/// Result of one run: identifier, terminal status, captured failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Stable run identifier from the run table
    pub run_id: String,
    /// Treatment under test
    pub treatment: String,
    /// 0-based repetition index
    pub repetition: u32,
    /// Terminal status
    pub status: RunStatus,
    /// Failure detail; present iff the status is not `Succeeded`
    pub failure: Option<FailureDetail>,
    /// Wall-clock duration of the run, milliseconds
    pub duration_ms: u64,
}

/// Overall status of the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Every run succeeded
    Succeeded,
    /// At least one run did not succeed
    Failed,
}

/// Aggregated result of a whole experiment, in run-table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    /// Experiment name
    pub experiment: String,
    /// Overall status
    pub status: ExperimentStatus,
    /// Experiment output directory, as registered for collaborators
    pub output_path: PathBuf,
    /// When the first run started
    pub started_at: DateTime<Utc>,
    /// When the last run finished
    pub finished_at: DateTime<Utc>,
    /// Per-run outcomes, one per planned run, in execution order
    pub runs: Vec<RunOutcome>,
}

impl ExperimentOutcome {
    /// Aggregate per-run outcomes into an experiment-level outcome.
    ///
    /// Overall status is `Succeeded` iff every run succeeded.
    pub fn aggregate(
        experiment: impl Into<String>,
        output_path: PathBuf,
        started_at: DateTime<Utc>,
        runs: Vec<RunOutcome>,
    ) -> Self {
        let status = if runs.iter().all(|run| run.status.is_success()) {
            ExperimentStatus::Succeeded
        } else {
            ExperimentStatus::Failed
        };
        Self {
            experiment: experiment.into(),
            status,
            output_path,
            started_at,
            finished_at: Utc::now(),
            runs,
        }
    }

    /// Whether every run succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == ExperimentStatus::Succeeded
    }

    /// The runs that did not succeed, in execution order.
    pub fn failed_runs(&self) -> impl Iterator<Item = &RunOutcome> {
        self.runs.iter().filter(|run| !run.status.is_success())
    }
}
