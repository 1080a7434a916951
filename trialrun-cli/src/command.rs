//! Utility Command Registry
//!
//! An explicit, constructed-once mapping from command name to handler,
//! populated at startup and passed to the dispatcher. Unknown commands
//! yield a usage error; invoking with no arguments routes to the built-in
//! `help` handler, which lists whatever is registered.
//!
//! Utility commands never touch the experiment engine's state; they are
//! the auxiliary surface next to the main experiment-execution path.

use crate::config::ExperimentFile;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use trialrun_core::{build_plan, validate};

/// A malformed or unknown utility invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The leading argument names no registered command.
    #[error("unknown command '{name}'; available commands: {available}")]
    UnknownCommand {
        /// What was asked for
        name: String,
        /// Comma-separated registered command names
        available: String,
    },

    /// A command was invoked with the wrong arguments.
    #[error("usage: trialrun {usage}")]
    Usage {
        /// Usage line of the offending command
        usage: &'static str,
    },

    /// Arguments that clap rejected on the experiment-execution path.
    #[error("{0}")]
    Invalid(String),
}

/// Handler invoked for a registered command with its trailing arguments.
pub type CommandHandler = fn(&CommandRegistry, &[String]) -> Result<()>;

/// A registered utility command.
#[derive(Clone)]
pub struct CommandSpec {
    /// Name matched against the leading argument
    pub name: &'static str,
    /// Usage line shown in help and usage errors
    pub usage: &'static str,
    /// One-line description shown in help
    pub about: &'static str,
    /// The handler
    pub handler: CommandHandler,
}

/// Explicit name → handler mapping for utility commands.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry populated with the built-in commands.
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        registry.register(CommandSpec {
            name: "help",
            usage: "help",
            about: "List available commands",
            handler: cmd_help,
        });
        registry.register(CommandSpec {
            name: "init",
            usage: "init [path]",
            about: "Write a template experiment file (default: experiment.toml)",
            handler: cmd_init,
        });
        registry.register(CommandSpec {
            name: "validate",
            usage: "validate <file.toml>",
            about: "Validate an experiment file",
            handler: cmd_validate,
        });
        registry.register(CommandSpec {
            name: "plan",
            usage: "plan <file.toml>",
            about: "Print the expanded run table without executing",
            handler: cmd_plan,
        });
        registry
    }

    /// Register a command, replacing any previous one with the same name.
    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    /// Dispatch a utility invocation: `args[0]` is the command name.
    ///
    /// An empty `args` routes to `help`.
    pub fn dispatch(&self, args: &[String]) -> Result<()> {
        let name = args.first().map(String::as_str).unwrap_or("help");
        let spec = self.commands.get(name).ok_or_else(|| {
            CommandError::UnknownCommand {
                name: name.to_string(),
                available: self
                    .commands
                    .keys()
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })?;
        (spec.handler)(self, args.get(1..).unwrap_or(&[]))
    }

    /// Render the help listing of all registered commands.
    pub fn render_help(&self) -> String {
        let mut output = String::new();
        output.push_str("trialrun - experiment trial sequencer\n\n");
        output.push_str("Run an experiment:\n");
        output.push_str("  trialrun <experiment.toml> [--dry-run] [--verbose]\n\n");
        output.push_str("Commands:\n");
        let width = self
            .commands
            .values()
            .map(|spec| spec.usage.len())
            .max()
            .unwrap_or(0);
        for spec in self.commands.values() {
            output.push_str(&format!(
                "  {:<width$}  {}\n",
                spec.usage,
                spec.about,
                width = width
            ));
        }
        output
    }
}

fn cmd_help(registry: &CommandRegistry, _args: &[String]) -> Result<()> {
    print!("{}", registry.render_help());
    Ok(())
}

fn cmd_init(_registry: &CommandRegistry, args: &[String]) -> Result<()> {
    let path = args.first().map(String::as_str).unwrap_or("experiment.toml");
    if Path::new(path).exists() {
        return Err(CommandError::Invalid(format!("refusing to overwrite existing {path}")).into());
    }
    std::fs::write(path, ExperimentFile::default_toml())?;
    println!("Wrote {path}");
    Ok(())
}

fn cmd_validate(_registry: &CommandRegistry, args: &[String]) -> Result<()> {
    let path = require_file_arg(args, "validate <file.toml>")?;
    let file = ExperimentFile::load(path)?;
    validate(&file.experiment)?;
    let config = &file.experiment;
    let repetitions = config.repetitions.unwrap_or_default();
    println!(
        "{}: configuration OK ({} treatments x {} repetitions = {} runs)",
        config.name,
        config.treatments.len(),
        repetitions,
        config.treatments.len() * repetitions as usize,
    );
    Ok(())
}

fn cmd_plan(_registry: &CommandRegistry, args: &[String]) -> Result<()> {
    let path = require_file_arg(args, "plan <file.toml>")?;
    let file = ExperimentFile::load(path)?;
    validate(&file.experiment)?;
    let table = build_plan(&file.experiment)?;
    print!("{}", render_plan(&file.experiment.name, &table));
    Ok(())
}

/// Render a run table in the tree style used by `plan` and `--dry-run`.
pub fn render_plan(experiment: &str, table: &trialrun_core::RunTable) -> String {
    let mut output = String::new();
    output.push_str(&format!("Run plan for {}:\n", experiment));

    let mut current_treatment: Option<&str> = None;
    for run in table {
        if current_treatment != Some(run.treatment.as_str()) {
            output.push_str(&format!("├── treatment: {}\n", run.treatment));
            current_treatment = Some(run.treatment.as_str());
        }
        let levels = run
            .levels
            .iter()
            .map(|(factor, level)| format!("{factor}={level}"))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("│   ├── {} [{}]\n", run.run_id, levels));
    }

    output.push_str(&format!("{} runs planned.\n", table.len()));
    output
}

fn require_file_arg<'a>(args: &'a [String], usage: &'static str) -> Result<&'a String> {
    args.first()
        .ok_or_else(|| CommandError::Usage { usage }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_command_is_a_usage_error() {
        let registry = CommandRegistry::with_builtin_commands();
        let err = registry.dispatch(&args(&["foo"])).unwrap_err();
        let usage = err.downcast_ref::<CommandError>().unwrap();
        assert!(matches!(usage, CommandError::UnknownCommand { .. }));
        assert!(usage.to_string().contains("plan"));
    }

    #[test]
    fn empty_invocation_routes_to_help() {
        let registry = CommandRegistry::with_builtin_commands();
        registry.dispatch(&[]).unwrap();
    }

    #[test]
    fn validate_without_argument_is_a_usage_error() {
        let registry = CommandRegistry::with_builtin_commands();
        let err = registry.dispatch(&args(&["validate"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::Usage { .. })
        ));
    }

    #[test]
    fn help_lists_registered_commands() {
        let registry = CommandRegistry::with_builtin_commands();
        let help = registry.render_help();
        for name in ["help", "init", "validate", "plan"] {
            assert!(help.contains(name), "help should mention {name}");
        }
    }

    #[test]
    fn registration_replaces_same_name() {
        fn noop(_registry: &CommandRegistry, _args: &[String]) -> Result<()> {
            Ok(())
        }
        let mut registry = CommandRegistry::new();
        registry.register(CommandSpec {
            name: "x",
            usage: "x",
            about: "first",
            handler: noop,
        });
        registry.register(CommandSpec {
            name: "x",
            usage: "x",
            about: "second",
            handler: noop,
        });
        assert!(registry.render_help().contains("second"));
        assert!(!registry.render_help().contains("first"));
    }

    #[test]
    fn render_plan_groups_by_treatment() {
        let config = trialrun_core::ExperimentConfig {
            name: "probe".to_string(),
            factors: vec![trialrun_core::Factor {
                name: "speed".to_string(),
                levels: vec!["slow".to_string()],
            }],
            treatments: vec![trialrun_core::Treatment {
                name: "baseline".to_string(),
                levels: [("speed".to_string(), "slow".to_string())].into(),
            }],
            repetitions: Some(2),
            ..Default::default()
        };
        let table = build_plan(&config).unwrap();
        let rendered = render_plan("probe", &table);
        assert!(rendered.contains("treatment: baseline"));
        assert!(rendered.contains("baseline-rep0 [speed=slow]"));
        assert!(rendered.contains("2 runs planned."));
    }
}
