//! Experiment File Loading
//!
//! The host-environment mechanism that produces an `ExperimentConfig`:
//! a TOML file authored by the user. The experiment definition itself is
//! flattened at the top level; the `[run]` section configures the harness
//! command executed during each trial's interact phase.
//!
//! Loading is deliberately permissive about absent fields: everything
//! defaults, and the validator reports what is missing as a typed shape
//! error instead of a serde message.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trialrun_core::ExperimentConfig;

/// Errors while reading an experiment file, before validation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read experiment file {path}: {source}")]
    Io {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for an experiment.
    #[error("cannot parse experiment file {path}: {source}")]
    Parse {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying TOML failure
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// A complete experiment file: the experiment plus host-side run settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentFile {
    /// The experiment definition, validated by `trialrun_core::validate`
    #[serde(flatten)]
    pub experiment: ExperimentConfig,
    /// Harness settings for executing each trial
    #[serde(default)]
    pub run: RunSection,
}

/// Host-side settings for the command executed during each trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Program and arguments executed during the interact phase.
    /// Empty means trials produce only their descriptors and directories.
    #[serde(default)]
    pub command: Vec<String>,
    /// Extra environment passed to the command
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ExperimentFile {
    /// Load an experiment file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Generate the template experiment file written by `trialrun init`.
    pub fn default_toml() -> String {
        r#"# trialrun experiment
# Validate with `trialrun validate <file>`, preview with `trialrun plan <file>`.

name = "example"
# Repetitions per treatment
repetitions = 3
# Per-run timeout in seconds for the measurement phases (uncomment to enable)
# timeout_secs = 60
# Root directory for experiment output
output_root = "results"

[[factors]]
name = "cpu_limit"
levels = ["low", "high"]

[[treatments]]
name = "baseline"
[treatments.levels]
cpu_limit = "low"

[[treatments]]
name = "boosted"
[treatments.levels]
cpu_limit = "high"

[run]
# Program executed once per trial, from the trial's output directory.
# The treatment is exposed through TRIAL_* environment variables.
command = ["./trial.sh"]

[run.env]
# Extra environment passed to every trial (uncomment to enable)
# MEASUREMENT_MODE = "energy"
"#
        .to_string()
    }
}
