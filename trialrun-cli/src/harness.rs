//! Harness Phases
//!
//! The default [`RunPhases`] implementation behind the CLI: each trial
//! writes its descriptor, then executes the configured command during the
//! interact phase with the treatment exposed through the environment.
//!
//! Artifacts per run directory:
//! - `trial.json`: the run descriptor (identifier, treatment, levels)
//! - `stdout.log` / `stderr.log`: captured command output
//! - `measurement.json`: exit status and measured wall-clock duration
//!
//! Environment passed to the command:
//! - `TRIAL_RUN_ID`, `TRIAL_TREATMENT`, `TRIAL_REPETITION`
//! - `TRIAL_OUTPUT_DIR` (the run directory), `TRIAL_EXPERIMENT_DIR`
//!   (read from the shared output-path registry)
//! - `TRIAL_FACTOR_<NAME>` for every factor binding of the treatment

use crate::config::RunSection;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs::File;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use trialrun_core::{PhaseError, RunContext, RunPhases};

/// How often the interact phase polls a running command.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Executes the configured command once per trial.
pub struct CommandPhases {
    command: Vec<String>,
    env: BTreeMap<String, String>,
    started: Option<Instant>,
    measured_ms: Option<u64>,
    exit_code: Option<i32>,
    timed_out: bool,
}

impl CommandPhases {
    /// Build harness phases from the experiment file's `[run]` section.
    pub fn new(run: &RunSection) -> Self {
        if run.command.is_empty() {
            warn!("no run.command configured; trials will only produce their descriptors");
        }
        Self {
            command: run.command.clone(),
            env: run.env.clone(),
            started: None,
            measured_ms: None,
            exit_code: None,
            timed_out: false,
        }
    }

    fn build_command(&self, ctx: &RunContext<'_>) -> Command {
        let mut command = Command::new(&self.command[0]);
        command.args(&self.command[1..]);
        command.current_dir(&ctx.run_dir);
        command.envs(&self.env);
        command.env("TRIAL_RUN_ID", &ctx.run.run_id);
        command.env("TRIAL_TREATMENT", &ctx.run.treatment);
        command.env("TRIAL_REPETITION", ctx.run.repetition.to_string());
        command.env("TRIAL_OUTPUT_DIR", &ctx.run_dir);
        if let Some(experiment_dir) = ctx.registry.experiment_output_path() {
            command.env("TRIAL_EXPERIMENT_DIR", experiment_dir);
        }
        for (factor, level) in &ctx.run.levels {
            command.env(format!("TRIAL_FACTOR_{}", env_key(factor)), level);
        }
        command
    }
}

impl RunPhases for CommandPhases {
    fn before_run(&mut self, ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        self.started = None;
        self.measured_ms = None;
        self.exit_code = None;
        self.timed_out = false;

        let descriptor = serde_json::to_vec_pretty(ctx.run)
            .map_err(|e| PhaseError::msg(format!("cannot encode trial descriptor: {e}")))?;
        std::fs::write(ctx.run_dir.join("trial.json"), descriptor)?;
        Ok(())
    }

    fn start_measurement(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn interact(&mut self, ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        if self.command.is_empty() {
            debug!(run_id = %ctx.run.run_id, "no command configured, interact is a no-op");
            return Ok(());
        }

        let stdout = File::create(ctx.run_dir.join("stdout.log"))?;
        let stderr = File::create(ctx.run_dir.join("stderr.log"))?;
        let mut command = self.build_command(ctx);
        command.stdin(Stdio::null());
        command.stdout(Stdio::from(stdout));
        command.stderr(Stdio::from(stderr));

        debug!(run_id = %ctx.run.run_id, command = ?self.command, "spawning trial command");
        let mut child = command.spawn().map_err(|e| {
            PhaseError::msg(format!("cannot spawn trial command {:?}: {e}", self.command[0]))
        })?;

        // Poll rather than block so a cooperative deadline can stop the
        // command before the controller classifies the overrun.
        loop {
            if let Some(status) = child.try_wait()? {
                self.exit_code = status.code();
                return match status.code() {
                    Some(0) => Ok(()),
                    Some(code) => Err(PhaseError::msg(format!(
                        "trial command exited with status {code}"
                    ))),
                    None => Err(PhaseError::msg("trial command terminated by signal")),
                };
            }
            if matches!(ctx.remaining(), Some(remaining) if remaining.is_zero()) {
                self.timed_out = true;
                let _ = child.kill();
                let _ = child.wait();
                return Err(PhaseError::msg("trial command exceeded the run timeout"));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn stop_measurement(&mut self, _ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        if let Some(started) = self.started {
            self.measured_ms = Some(started.elapsed().as_millis() as u64);
        }
        Ok(())
    }

    fn after_run(&mut self, ctx: &RunContext<'_>) -> Result<(), PhaseError> {
        let record = json!({
            "run_id": ctx.run.run_id,
            "exit_code": self.exit_code,
            "duration_ms": self.measured_ms,
            "timed_out": self.timed_out,
        });
        let encoded = serde_json::to_vec_pretty(&record)
            .map_err(|e| PhaseError::msg(format!("cannot encode measurement record: {e}")))?;
        std::fs::write(ctx.run_dir.join("measurement.json"), encoded)?;
        Ok(())
    }
}

fn env_key(factor: &str) -> String {
    factor
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use trialrun_core::{OutputPathRegistry, RunDescriptor};

    fn descriptor() -> RunDescriptor {
        let mut levels = BTreeMap::new();
        levels.insert("cpu-limit".to_string(), "low".to_string());
        RunDescriptor {
            run_id: "baseline-rep0".to_string(),
            treatment: "baseline".to_string(),
            levels,
            repetition: 0,
            output_subdir: PathBuf::from("baseline-rep0"),
        }
    }

    fn section(command: &[&str]) -> RunSection {
        RunSection {
            command: command.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    fn context<'a>(
        run: &'a RunDescriptor,
        registry: &'a OutputPathRegistry,
        run_dir: PathBuf,
    ) -> RunContext<'a> {
        RunContext {
            run,
            registry,
            run_dir,
            deadline: None,
        }
    }

    #[test]
    fn env_key_sanitizes_factor_names() {
        assert_eq!(env_key("cpu-limit"), "CPU_LIMIT");
        assert_eq!(env_key("speed"), "SPEED");
    }

    #[test]
    fn empty_command_interact_is_a_noop() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&run, &registry, dir.path().to_path_buf());
        let mut phases = CommandPhases::new(&section(&[]));
        phases.interact(&ctx).unwrap();
    }

    #[test]
    fn before_run_writes_the_trial_descriptor() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&run, &registry, dir.path().to_path_buf());
        let mut phases = CommandPhases::new(&section(&[]));
        phases.before_run(&ctx).unwrap();

        let written = std::fs::read_to_string(dir.path().join("trial.json")).unwrap();
        let back: RunDescriptor = serde_json::from_str(&written).unwrap();
        assert_eq!(back, run);
    }

    #[cfg(unix)]
    #[test]
    fn interact_captures_output_and_after_run_records_measurement() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        registry.set_experiment_output_path("/tmp/exp");
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&run, &registry, dir.path().to_path_buf());

        let mut phases = CommandPhases::new(&section(&[
            "/bin/sh",
            "-c",
            "echo treatment=$TRIAL_TREATMENT factor=$TRIAL_FACTOR_CPU_LIMIT",
        ]));
        phases.before_run(&ctx).unwrap();
        phases.start_measurement(&ctx).unwrap();
        phases.interact(&ctx).unwrap();
        phases.stop_measurement(&ctx).unwrap();
        phases.after_run(&ctx).unwrap();

        let stdout = std::fs::read_to_string(dir.path().join("stdout.log")).unwrap();
        assert_eq!(stdout.trim(), "treatment=baseline factor=low");

        let measurement =
            std::fs::read_to_string(dir.path().join("measurement.json")).unwrap();
        let record: serde_json::Value = serde_json::from_str(&measurement).unwrap();
        assert_eq!(record["exit_code"], 0);
        assert_eq!(record["timed_out"], false);
        assert!(record["duration_ms"].is_u64());
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_a_phase_error() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&run, &registry, dir.path().to_path_buf());

        let mut phases = CommandPhases::new(&section(&["/bin/sh", "-c", "exit 3"]));
        phases.before_run(&ctx).unwrap();
        let err = phases.interact(&ctx).unwrap_err();
        assert!(err.to_string().contains("status 3"));
    }

    #[cfg(unix)]
    #[test]
    fn expired_deadline_kills_the_command() {
        let run = descriptor();
        let registry = OutputPathRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&run, &registry, dir.path().to_path_buf());
        ctx.deadline = Some(Instant::now() - Duration::from_millis(1));

        let mut phases = CommandPhases::new(&section(&["/bin/sh", "-c", "sleep 30"]));
        phases.before_run(&ctx).unwrap();
        let start = Instant::now();
        let err = phases.interact(&ctx).unwrap_err();
        assert!(err.to_string().contains("timeout"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
