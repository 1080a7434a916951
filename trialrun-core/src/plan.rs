//! Run Plan Builder
//!
//! Expands a validated configuration into an ordered run table: treatments
//! in declaration order, repetition indices ascending. The expansion is
//! deterministic, so two builds of the same configuration produce
//! identical tables and identical directory assignments.

use crate::config::ExperimentConfig;
use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// One planned trial. Created by [`build_plan`]; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescriptor {
    /// Stable run identifier, unique within the experiment
    pub run_id: String,
    /// Name of the treatment under test
    pub treatment: String,
    /// Resolved factor → level bindings of the treatment
    pub levels: BTreeMap<String, String>,
    /// 0-based repetition index
    pub repetition: u32,
    /// Output subdirectory relative to the experiment path
    pub output_subdir: PathBuf,
}

/// Ordered sequence of planned runs; insertion order is execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTable {
    runs: Vec<RunDescriptor>,
}

impl RunTable {
    /// Number of planned runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the table contains no runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The planned runs, in execution order.
    pub fn runs(&self) -> &[RunDescriptor] {
        &self.runs
    }

    /// Iterate the planned runs in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, RunDescriptor> {
        self.runs.iter()
    }
}

impl<'a> IntoIterator for &'a RunTable {
    type Item = &'a RunDescriptor;
    type IntoIter = std::slice::Iter<'a, RunDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}

/// Expand a validated configuration into its run table.
///
/// For each treatment in declaration order, emits `repetitions` entries
/// with repetition indices `0..repetitions`. Identifier collisions can
/// only occur when validation missed a duplicate treatment name, so they
/// surface as [`PlanError::DuplicateRunId`] rather than a user-facing
/// configuration error.
pub fn build_plan(config: &ExperimentConfig) -> Result<RunTable, PlanError> {
    let repetitions = config.repetitions.unwrap_or_default();
    let mut runs = Vec::with_capacity(config.treatments.len() * repetitions as usize);
    let mut seen = BTreeSet::new();

    for treatment in &config.treatments {
        for repetition in 0..repetitions {
            let run_id = format!("{}-rep{}", treatment.name, repetition);
            if !seen.insert(run_id.clone()) {
                return Err(PlanError::DuplicateRunId { run_id });
            }
            runs.push(RunDescriptor {
                output_subdir: PathBuf::from(&run_id),
                run_id,
                treatment: treatment.name.clone(),
                levels: treatment.levels.clone(),
                repetition,
            });
        }
    }

    Ok(RunTable { runs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Factor, Treatment};

    fn config(treatments: &[&str], repetitions: u32) -> ExperimentConfig {
        ExperimentConfig {
            name: "probe".to_string(),
            factors: vec![Factor {
                name: "speed".to_string(),
                levels: vec!["slow".to_string(), "fast".to_string()],
            }],
            treatments: treatments
                .iter()
                .map(|name| {
                    let mut levels = BTreeMap::new();
                    levels.insert("speed".to_string(), "slow".to_string());
                    Treatment {
                        name: name.to_string(),
                        levels,
                    }
                })
                .collect(),
            repetitions: Some(repetitions),
            ..Default::default()
        }
    }

    #[test]
    fn expands_treatments_times_repetitions() {
        let table = build_plan(&config(&["a", "b"], 3)).unwrap();
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn orders_treatment_then_repetition() {
        let table = build_plan(&config(&["a", "b"], 2)).unwrap();
        let ids: Vec<_> = table.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, ["a-rep0", "a-rep1", "b-rep0", "b-rep1"]);
        assert_eq!(table.runs()[1].repetition, 1);
        assert_eq!(table.runs()[2].treatment, "b");
    }

    #[test]
    fn run_ids_are_unique() {
        let table = build_plan(&config(&["a", "b", "c"], 4)).unwrap();
        let mut ids: Vec<_> = table.iter().map(|r| r.run_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), table.len());
    }

    #[test]
    fn rebuild_is_deterministic() {
        let config = config(&["a", "b"], 2);
        assert_eq!(build_plan(&config).unwrap(), build_plan(&config).unwrap());
    }

    #[test]
    fn output_subdir_derives_from_run_id() {
        let table = build_plan(&config(&["a"], 1)).unwrap();
        let run = &table.runs()[0];
        assert_eq!(run.output_subdir, PathBuf::from(&run.run_id));
    }

    #[test]
    fn duplicate_treatment_names_are_an_internal_error() {
        // A config that slipped past validation with a duplicate name.
        let err = build_plan(&config(&["a", "a"], 1)).unwrap_err();
        assert_eq!(
            err,
            PlanError::DuplicateRunId {
                run_id: "a-rep0".to_string(),
            }
        );
    }

    #[test]
    fn carries_resolved_levels() {
        let table = build_plan(&config(&["a"], 1)).unwrap();
        assert_eq!(
            table.runs()[0].levels.get("speed").map(String::as_str),
            Some("slow")
        );
    }
}
