//! Run Lifecycle Phases
//!
//! Every trial passes through the same fixed sequence of named hooks:
//!
//! ```text
//! BeforeRun → StartRun → StartMeasurement → Interact
//!           → StopMeasurement → StopRun → AfterRun
//! ```
//!
//! Collaborators (profilers, data writers, harness drivers) implement
//! [`RunPhases`]; every hook defaults to a no-op so implementations only
//! override the phases they care about. The fixed ordering is the
//! contract that tells a collaborator when to start and stop capturing.
//!
//! `StopRun` and `AfterRun` are cleanup phases: once a run's `BeforeRun`
//! has been entered they always execute, even after an earlier phase of
//! the same run failed.

use crate::error::PhaseError;
use crate::output::OutputPathRegistry;
use crate::plan::RunDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// The seven lifecycle hooks, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Per-run preparation before anything is started
    BeforeRun,
    /// Bring the system under test up
    StartRun,
    /// Arm measurement collaborators
    StartMeasurement,
    /// The measured interaction with the system under test
    Interact,
    /// Disarm measurement collaborators
    StopMeasurement,
    /// Bring the system under test down (cleanup)
    StopRun,
    /// Per-run teardown after everything is stopped (cleanup)
    AfterRun,
}

impl Phase {
    /// All phases in execution order.
    pub const ORDER: [Phase; 7] = [
        Phase::BeforeRun,
        Phase::StartRun,
        Phase::StartMeasurement,
        Phase::Interact,
        Phase::StopMeasurement,
        Phase::StopRun,
        Phase::AfterRun,
    ];

    /// Whether this phase is exempt from failure short-circuiting.
    pub fn is_cleanup(self) -> bool {
        matches!(self, Phase::StopRun | Phase::AfterRun)
    }

    /// Whether the per-run timeout bounds this phase.
    pub fn is_measured(self) -> bool {
        matches!(
            self,
            Phase::StartMeasurement | Phase::Interact | Phase::StopMeasurement
        )
    }

    /// Stable snake_case name, as used in logs and outcome records.
    pub fn name(self) -> &'static str {
        match self {
            Phase::BeforeRun => "before_run",
            Phase::StartRun => "start_run",
            Phase::StartMeasurement => "start_measurement",
            Phase::Interact => "interact",
            Phase::StopMeasurement => "stop_measurement",
            Phase::StopRun => "stop_run",
            Phase::AfterRun => "after_run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a phase implementation may consult about the current run.
#[derive(Debug)]
pub struct RunContext<'a> {
    /// The trial being executed
    pub run: &'a RunDescriptor,
    /// Shared output-path registry; already set for this experiment
    pub registry: &'a OutputPathRegistry,
    /// Directory receiving this run's artifacts
    pub run_dir: PathBuf,
    /// Cooperative deadline for the measurement phases, once armed
    pub deadline: Option<Instant>,
}

impl RunContext<'_> {
    /// Time remaining until the deadline; `None` when no timeout is armed.
    ///
    /// Returns a zero duration once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Lifecycle hooks invoked by the controller, in [`Phase::ORDER`].
///
/// Every hook defaults to a no-op. Hooks take `&mut self` so an
/// implementation can carry per-run state (timers, child processes)
/// between phases of the same run.
pub trait RunPhases {
    /// Per-run preparation before anything is started.
    fn before_run(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }

    /// Bring the system under test up.
    fn start_run(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }

    /// Arm measurement collaborators.
    fn start_measurement(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }

    /// The measured interaction with the system under test.
    fn interact(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }

    /// Disarm measurement collaborators.
    fn stop_measurement(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }

    /// Bring the system under test down. Cleanup: always invoked once
    /// `before_run` was entered.
    fn stop_run(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }

    /// Per-run teardown. Cleanup: always invoked once `before_run` was
    /// entered.
    fn after_run(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        Ok(())
    }
}

/// A [`RunPhases`] implementation that does nothing in every phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPhases;

impl RunPhases for NoopPhases {}

/// Invoke the hook named by `phase` on a phase implementation.
pub fn invoke(
    phases: &mut dyn RunPhases,
    phase: Phase,
    ctx: &RunContext<'_>,
) -> Result<(), PhaseError> {
    match phase {
        Phase::BeforeRun => phases.before_run(ctx),
        Phase::StartRun => phases.start_run(ctx),
        Phase::StartMeasurement => phases.start_measurement(ctx),
        Phase::Interact => phases.interact(ctx),
        Phase::StopMeasurement => phases.stop_measurement(ctx),
        Phase::StopRun => phases.stop_run(ctx),
        Phase::AfterRun => phases.after_run(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn descriptor() -> RunDescriptor {
        RunDescriptor {
            run_id: "baseline-rep0".to_string(),
            treatment: "baseline".to_string(),
            levels: BTreeMap::new(),
            repetition: 0,
            output_subdir: PathBuf::from("baseline-rep0"),
        }
    }

    #[test]
    fn order_covers_every_phase_once() {
        assert_eq!(Phase::ORDER.len(), 7);
        assert_eq!(Phase::ORDER[0], Phase::BeforeRun);
        assert_eq!(Phase::ORDER[6], Phase::AfterRun);
    }

    #[test]
    fn only_teardown_phases_are_cleanup() {
        let cleanup: Vec<_> = Phase::ORDER.iter().filter(|p| p.is_cleanup()).collect();
        assert_eq!(cleanup, [&Phase::StopRun, &Phase::AfterRun]);
    }

    #[test]
    fn measured_phases_are_the_measurement_window() {
        let measured: Vec<_> = Phase::ORDER.iter().filter(|p| p.is_measured()).collect();
        assert_eq!(
            measured,
            [
                &Phase::StartMeasurement,
                &Phase::Interact,
                &Phase::StopMeasurement
            ]
        );
    }

    #[test]
    fn noop_phases_accept_every_hook() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let ctx = RunContext {
            run: &run,
            registry: &registry,
            run_dir: PathBuf::from("/tmp/x"),
            deadline: None,
        };
        let mut phases = NoopPhases;
        for phase in Phase::ORDER {
            invoke(&mut phases, phase, &ctx).unwrap();
        }
    }

    #[test]
    fn invoke_routes_to_the_named_hook() {
        struct Recorder {
            seen: Vec<Phase>,
        }
        impl RunPhases for Recorder {
            fn interact(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
                self.seen.push(Phase::Interact);
                Ok(())
            }
            fn stop_run(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
                self.seen.push(Phase::StopRun);
                Ok(())
            }
        }

        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let ctx = RunContext {
            run: &run,
            registry: &registry,
            run_dir: PathBuf::from("/tmp/x"),
            deadline: None,
        };
        let mut recorder = Recorder { seen: Vec::new() };
        invoke(&mut recorder, Phase::Interact, &ctx).unwrap();
        invoke(&mut recorder, Phase::StopRun, &ctx).unwrap();
        invoke(&mut recorder, Phase::BeforeRun, &ctx).unwrap();
        assert_eq!(recorder.seen, [Phase::Interact, Phase::StopRun]);
    }

    #[test]
    fn remaining_is_zero_after_deadline() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let ctx = RunContext {
            run: &run,
            registry: &registry,
            run_dir: PathBuf::from("/tmp/x"),
            deadline: Some(Instant::now() - Duration::from_millis(5)),
        };
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }
}
