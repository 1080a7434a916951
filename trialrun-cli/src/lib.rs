#![warn(missing_docs)]
//! trialrun CLI Library
//!
//! Entry-point plumbing for the `trialrun` binary. The process contract:
//! no argument shows help, a path ending in `.toml` runs that experiment,
//! and anything else dispatches to the utility command registry.
//!
//! # Example
//!
//! ```ignore
//! fn main() {
//!     match trialrun_cli::run() {
//!         Ok(code) => std::process::exit(code),
//!         Err(err) => { /* classified vs full-trace presentation */ }
//!     }
//! }
//! ```

mod command;
mod config;
mod executor;
mod harness;

pub use command::{CommandError, CommandHandler, CommandRegistry, CommandSpec, render_plan};
pub use config::{ExperimentFile, LoadError, RunSection};
pub use executor::{ControllerState, ExperimentController, format_summary, write_summary_json};
pub use harness::CommandPhases;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use trialrun_core::{ConfigError, EngineError, OutputPathRegistry, PlanError, build_plan, validate};

/// Arguments accepted when the first argument is an experiment file.
#[derive(Parser, Debug)]
#[command(name = "trialrun", about = "trialrun - experiment trial sequencer", version)]
pub struct RunArgs {
    /// Path to the experiment file
    pub experiment: PathBuf,

    /// Print the expanded run table without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the trialrun CLI against the process arguments.
///
/// Returns the process exit code: 0 for full success, 1 for an experiment
/// that ran with failing trials. Classified and unclassified errors
/// surface as `Err` for the binary to present.
pub fn run() -> Result<i32> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    run_with_args(&args)
}

/// Run the trialrun CLI against explicit arguments (exclusive of argv[0]).
pub fn run_with_args(args: &[String]) -> Result<i32> {
    let registry = CommandRegistry::with_builtin_commands();
    match args.first() {
        None => {
            registry.dispatch(&[])?;
            Ok(0)
        }
        Some(first) if first.ends_with(".toml") => run_experiment(args),
        Some(_) => {
            registry.dispatch(args)?;
            Ok(0)
        }
    }
}

fn run_experiment(args: &[String]) -> Result<i32> {
    let argv = std::iter::once("trialrun").chain(args.iter().map(String::as_str));
    let cli = RunArgs::try_parse_from(argv).map_err(|e| CommandError::Invalid(e.to_string()))?;

    init_logging(cli.verbose);

    let file = ExperimentFile::load(&cli.experiment)?;

    if cli.dry_run {
        validate(&file.experiment)?;
        let table = build_plan(&file.experiment)?;
        print!("{}", render_plan(&file.experiment.name, &table));
        return Ok(0);
    }

    let registry = Arc::new(OutputPathRegistry::new());
    let mut controller = ExperimentController::new(Arc::clone(&registry));
    let mut phases = CommandPhases::new(&file.run);
    let outcome = controller.run(&file.experiment, &mut phases)?;

    print!("{}", format_summary(&outcome));
    Ok(if outcome.succeeded() { 0 } else { 1 })
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "trialrun_core=debug,trialrun_cli=debug"
    } else {
        "trialrun_core=info,trialrun_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .ok();
}

/// Short message for a classified error, or `None` for unanticipated
/// faults that deserve the full diagnostic trace.
pub fn classified_message(err: &anyhow::Error) -> Option<String> {
    if let Some(e) = err.downcast_ref::<EngineError>() {
        return Some(e.to_string());
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return Some(format!("configuration error: {e}"));
    }
    if let Some(e) = err.downcast_ref::<PlanError>() {
        return Some(format!("run plan error: {e}"));
    }
    if let Some(e) = err.downcast_ref::<LoadError>() {
        return Some(e.to_string());
    }
    if let Some(e) = err.downcast_ref::<CommandError>() {
        return Some(e.to_string());
    }
    None
}
