//! Configuration Validation
//!
//! A pure gate in front of the engine: no state, no I/O. Checks run in a
//! fixed order and stop at the first failure, so every rejected
//! configuration maps to exactly one [`ConfigError`] kind:
//!
//! 1. shape: required parts present, names unique
//! 2. references: treatments resolve against declared factors/levels
//! 3. values: repetition count and timeout are positive
//!
//! Validation is total: the whole structure is examined before any run
//! starts; nothing is deferred to runtime.

use crate::config::ExperimentConfig;
use crate::error::ConfigError;
use std::collections::BTreeSet;

/// Validate an experiment configuration.
///
/// Returns `Ok(())` iff the configuration is structurally complete, every
/// treatment reference resolves, and all numeric fields are positive.
pub fn validate(config: &ExperimentConfig) -> Result<(), ConfigError> {
    check_shape(config)?;
    check_references(config)?;
    check_values(config)
}

fn check_shape(config: &ExperimentConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(shape("name", "experiment name is missing or empty"));
    }
    if config.factors.is_empty() {
        return Err(shape("factors", "no factors declared"));
    }
    if config.treatments.is_empty() {
        return Err(shape("treatments", "no treatments declared"));
    }
    if config.repetitions.is_none() {
        return Err(shape("repetitions", "repetition count is missing"));
    }

    let mut factor_names = BTreeSet::new();
    for factor in &config.factors {
        if factor.name.trim().is_empty() {
            return Err(shape("factors", "a factor has an empty name"));
        }
        if factor.levels.is_empty() {
            return Err(shape(
                "factors",
                format!("factor '{}' declares no levels", factor.name),
            ));
        }
        if !factor_names.insert(factor.name.as_str()) {
            return Err(shape(
                "factors",
                format!("duplicate factor name '{}'", factor.name),
            ));
        }
    }

    let mut treatment_names = BTreeSet::new();
    for treatment in &config.treatments {
        if treatment.name.trim().is_empty() {
            return Err(shape("treatments", "a treatment has an empty name"));
        }
        if !treatment_names.insert(treatment.name.as_str()) {
            return Err(shape(
                "treatments",
                format!("duplicate treatment name '{}'", treatment.name),
            ));
        }
    }

    Ok(())
}

fn check_references(config: &ExperimentConfig) -> Result<(), ConfigError> {
    for treatment in &config.treatments {
        for (factor_name, level) in &treatment.levels {
            let factor = config.factor(factor_name).ok_or_else(|| {
                ConfigError::UnknownFactor {
                    treatment: treatment.name.clone(),
                    factor: factor_name.clone(),
                }
            })?;
            if !factor.has_level(level) {
                return Err(ConfigError::UnknownLevel {
                    treatment: treatment.name.clone(),
                    factor: factor_name.clone(),
                    level: level.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_values(config: &ExperimentConfig) -> Result<(), ConfigError> {
    if let Some(0) = config.repetitions {
        return Err(ConfigError::InvalidValue {
            field: "repetitions",
            value: 0,
        });
    }
    if let Some(0) = config.timeout_secs {
        return Err(ConfigError::InvalidValue {
            field: "timeout_secs",
            value: 0,
        });
    }
    Ok(())
}

fn shape(field: &'static str, detail: impl Into<String>) -> ConfigError {
    ConfigError::Shape {
        field,
        detail: detail.into(),
    }
}
