//! Experiment Controller
//!
//! The top-level state machine that turns a validated configuration into
//! an experiment outcome:
//!
//! ```text
//! Idle → Validating → Preparing → Executing → Summarizing → Done
//!             │            │
//!             └────────────┴──→ Aborted
//! ```
//!
//! Runs execute strictly sequentially in run-table order. Within a run,
//! the seven lifecycle phases fire in fixed order; the first failing
//! phase short-circuits the rest of that run except the cleanup phases
//! (`stop_run`, `after_run`), which always execute once `before_run` was
//! entered. One run's failure never aborts the experiment.
//!
//! A panicking phase is caught and recorded as an unclassified failure on
//! its run. When the measurement phases overrun the configured per-run
//! timeout, the overrun is classified as a timeout and takes precedence
//! over the phase's own result.

use crate::executor::summary::write_summary_json;
use indicatif::{ProgressBar, ProgressStyle};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use trialrun_core::{
    EngineError, ExperimentConfig, ExperimentOutcome, FailureDetail, FailureKind,
    OutputPathRegistry, Phase, RunContext, RunDescriptor, RunOutcome, RunPhases, RunStatus,
    build_plan, invoke, validate,
};

/// States of the experiment-level machine. `Done` and `Aborted` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing has happened yet
    Idle,
    /// Config validation in progress
    Validating,
    /// Output registry and run table being established
    Preparing,
    /// Runs executing in table order
    Executing,
    /// Per-run outcomes being aggregated
    Summarizing,
    /// Outcome returned; no further transitions
    Done,
    /// Unrecoverable failure during Validating or Preparing
    Aborted,
}

/// Drives one experiment through validation, planning, and execution.
pub struct ExperimentController {
    registry: Arc<OutputPathRegistry>,
    state: ControllerState,
}

impl ExperimentController {
    /// Create a controller around the shared output-path registry.
    pub fn new(registry: Arc<OutputPathRegistry>) -> Self {
        Self {
            registry,
            state: ControllerState::Idle,
        }
    }

    /// Current state; observable for tests and diagnostics.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Execute the whole experiment once.
    ///
    /// Configuration and preparation failures abort before any run starts
    /// and surface as `Err`. Once Executing begins, every planned run
    /// yields exactly one [`RunOutcome`] and the call returns `Ok`.
    pub fn run(
        &mut self,
        config: &ExperimentConfig,
        phases: &mut dyn RunPhases,
    ) -> Result<ExperimentOutcome, EngineError> {
        self.transition(ControllerState::Validating);
        if let Err(err) = validate(config) {
            self.transition(ControllerState::Aborted);
            return Err(err.into());
        }

        self.transition(ControllerState::Preparing);
        let experiment_path = config.experiment_path();
        if let Err(source) = std::fs::create_dir_all(&experiment_path) {
            self.transition(ControllerState::Aborted);
            return Err(EngineError::Prepare {
                path: experiment_path,
                source,
            });
        }
        self.registry.set_experiment_output_path(&experiment_path);
        let table = match build_plan(config) {
            Ok(table) => table,
            Err(err) => {
                self.transition(ControllerState::Aborted);
                return Err(err.into());
            }
        };

        self.transition(ControllerState::Executing);
        info!(
            experiment = %config.name,
            runs = table.len(),
            output = %experiment_path.display(),
            "starting experiment"
        );
        let started_at = chrono::Utc::now();
        let timeout = config.timeout();

        let progress = ProgressBar::new(table.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut runs = Vec::with_capacity(table.len());
        for descriptor in &table {
            progress.set_message(descriptor.run_id.clone());
            runs.push(self.execute_run(descriptor, phases, timeout, &experiment_path));
            progress.inc(1);
        }
        progress.finish_with_message("Complete");

        self.transition(ControllerState::Summarizing);
        let outcome =
            ExperimentOutcome::aggregate(config.name.clone(), experiment_path, started_at, runs);
        let summary_path = outcome.output_path.join("summary.json");
        if let Err(err) = write_summary_json(&summary_path, &outcome) {
            warn!(path = %summary_path.display(), error = %err, "cannot write experiment summary");
        }

        self.transition(ControllerState::Done);
        Ok(outcome)
    }

    /// Drive one run through the lifecycle phases.
    ///
    /// Always produces an outcome; failures are contained to this run.
    fn execute_run(
        &self,
        run: &RunDescriptor,
        phases: &mut dyn RunPhases,
        timeout: Option<Duration>,
        experiment_path: &std::path::Path,
    ) -> RunOutcome {
        let run_started = Instant::now();
        let run_dir = experiment_path.join(&run.output_subdir);
        if let Err(err) = std::fs::create_dir_all(&run_dir) {
            warn!(run_id = %run.run_id, error = %err, "cannot create run directory");
            return self.finish_run(
                run,
                run_started,
                Some(FailureDetail {
                    kind: FailureKind::Unclassified,
                    phase: None,
                    message: format!("cannot create run directory {}: {err}", run_dir.display()),
                }),
            );
        }

        let mut ctx = RunContext {
            run,
            registry: &self.registry,
            run_dir,
            deadline: None,
        };
        let mut failure: Option<FailureDetail> = None;

        for phase in Phase::ORDER {
            if failure.is_some() && !phase.is_cleanup() {
                continue;
            }
            if phase == Phase::StartMeasurement {
                ctx.deadline = timeout.map(|t| Instant::now() + t);
            }

            debug!(run_id = %run.run_id, phase = %phase, "entering phase");
            let result = invoke_caught(phases, phase, &ctx);
            let overran = phase.is_measured()
                && ctx
                    .deadline
                    .map(|deadline| Instant::now() > deadline)
                    .unwrap_or(false);

            let phase_failure = match result {
                Ok(()) if overran => Some(timeout_failure(phase, timeout)),
                Ok(()) => None,
                Err(_) if overran => Some(timeout_failure(phase, timeout)),
                Err(detail) => Some(detail),
            };

            if let Some(detail) = phase_failure {
                warn!(
                    run_id = %run.run_id,
                    phase = %phase,
                    message = %detail.message,
                    "phase failed"
                );
                if failure.is_none() {
                    failure = Some(detail);
                }
            }
        }

        self.finish_run(run, run_started, failure)
    }

    fn finish_run(
        &self,
        run: &RunDescriptor,
        run_started: Instant,
        failure: Option<FailureDetail>,
    ) -> RunOutcome {
        let status = if failure.is_some() {
            RunStatus::FailedExecution
        } else {
            RunStatus::Succeeded
        };
        info!(run_id = %run.run_id, status = ?status, "run finished");
        RunOutcome {
            run_id: run.run_id.clone(),
            treatment: run.treatment.clone(),
            repetition: run.repetition,
            status,
            failure,
            duration_ms: run_started.elapsed().as_millis() as u64,
        }
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "controller transition");
        self.state = next;
    }
}

/// Invoke a phase, converting a raised error or a panic into a failure
/// detail.
fn invoke_caught(
    phases: &mut dyn RunPhases,
    phase: Phase,
    ctx: &RunContext<'_>,
) -> Result<(), FailureDetail> {
    let outcome = catch_unwind(AssertUnwindSafe(|| invoke(phases, phase, ctx)));
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(FailureDetail {
            kind: FailureKind::Phase,
            phase: Some(phase),
            message: err.to_string(),
        }),
        Err(panic) => {
            let message = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(FailureDetail {
                kind: FailureKind::Unclassified,
                phase: Some(phase),
                message: format!("phase panicked: {message}"),
            })
        }
    }
}

fn timeout_failure(phase: Phase, timeout: Option<Duration>) -> FailureDetail {
    let bound = timeout
        .map(|t| format!("{}s", t.as_secs()))
        .unwrap_or_else(|| "the configured".to_string());
    FailureDetail {
        kind: FailureKind::Timeout,
        phase: Some(phase),
        message: format!("measurement phases exceeded the {bound} run timeout"),
    }
}
