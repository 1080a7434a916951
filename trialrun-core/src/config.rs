//! Experiment Configuration Model
//!
//! The user-authored description of an experiment: named factors with
//! ordered level sets, treatments that bind factors to levels, and a
//! repetition count per treatment. Configurations are plain data; they
//! become trustworthy only after passing [`crate::validate`].
//!
//! Every field carries `#[serde(default)]` so that a structurally
//! incomplete file still deserializes and the validator can report the
//! missing piece as a typed shape error instead of a parse failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Output root used when the configuration does not name one.
pub const DEFAULT_OUTPUT_ROOT: &str = "results";

/// A user-authored experiment definition. Immutable once validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment name; also the experiment's directory under the output root
    #[serde(default)]
    pub name: String,
    /// Declared experimental variables, in declaration order
    #[serde(default)]
    pub factors: Vec<Factor>,
    /// Named factor-level combinations under test, in declaration order
    #[serde(default)]
    pub treatments: Vec<Treatment>,
    /// Repetition count per treatment; `None` means the field was absent
    #[serde(default)]
    pub repetitions: Option<u32>,
    /// Per-run timeout in seconds bounding the measurement phases
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Root directory for experiment output; defaults to [`DEFAULT_OUTPUT_ROOT`]
    #[serde(default)]
    pub output_root: Option<PathBuf>,
}

impl ExperimentConfig {
    /// Look up a declared factor by name.
    pub fn factor(&self, name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.name == name)
    }

    /// The output root, falling back to [`DEFAULT_OUTPUT_ROOT`].
    pub fn output_root(&self) -> &Path {
        self.output_root
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_ROOT))
    }

    /// Directory that receives every artifact of this experiment.
    pub fn experiment_path(&self) -> PathBuf {
        self.output_root().join(&self.name)
    }

    /// Per-run timeout as a [`Duration`], if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// A named experimental variable with a finite, ordered set of levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Factor name, referenced by treatments
    #[serde(default)]
    pub name: String,
    /// Declared levels, in declaration order
    #[serde(default)]
    pub levels: Vec<String>,
}

impl Factor {
    /// Whether `level` is among the declared levels.
    pub fn has_level(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }
}

/// A named combination of factor levels under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    /// Treatment name; part of every run identifier derived from it
    #[serde(default)]
    pub name: String,
    /// Factor name → selected level
    #[serde(default)]
    pub levels: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_absent_fields() {
        let config: ExperimentConfig = toml::from_str("name = \"probe\"").unwrap();
        assert_eq!(config.name, "probe");
        assert!(config.factors.is_empty());
        assert!(config.treatments.is_empty());
        assert_eq!(config.repetitions, None);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn experiment_path_uses_default_root() {
        let config = ExperimentConfig {
            name: "probe".to_string(),
            ..Default::default()
        };
        assert_eq!(config.experiment_path(), PathBuf::from("results/probe"));
    }

    #[test]
    fn experiment_path_honors_configured_root() {
        let config = ExperimentConfig {
            name: "probe".to_string(),
            output_root: Some(PathBuf::from("/tmp/out")),
            ..Default::default()
        };
        assert_eq!(config.experiment_path(), PathBuf::from("/tmp/out/probe"));
    }

    #[test]
    fn factor_lookup_and_levels() {
        let config = ExperimentConfig {
            factors: vec![Factor {
                name: "speed".to_string(),
                levels: vec!["slow".to_string(), "medium".to_string()],
            }],
            ..Default::default()
        };
        let factor = config.factor("speed").unwrap();
        assert!(factor.has_level("slow"));
        assert!(!factor.has_level("fast"));
        assert!(config.factor("memory").is_none());
    }
}
