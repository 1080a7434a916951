//! Experiment Summary Output
//!
//! Human-readable terminal summary of an experiment outcome, plus the
//! JSON record persisted under the experiment's output path.

use std::io::Write;
use std::path::Path;
use trialrun_core::{ExperimentOutcome, FailureKind, RunStatus};

/// Format an experiment outcome for terminal display.
pub fn format_summary(outcome: &ExperimentOutcome) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!("Experiment: {}\n", outcome.experiment));
    output.push_str(&"=".repeat(60));
    output.push('\n');

    for run in &outcome.runs {
        let status_icon = match run.status {
            RunStatus::Succeeded => "✓",
            RunStatus::FailedValidation | RunStatus::FailedExecution => "✗",
            RunStatus::Skipped => "⊘",
        };
        output.push_str(&format!(
            "  {} {} ({} ms)\n",
            status_icon, run.run_id, run.duration_ms
        ));
        if let Some(failure) = &run.failure {
            let kind = match failure.kind {
                FailureKind::Phase => "phase failure",
                FailureKind::Timeout => "timeout",
                FailureKind::Unclassified => "unclassified fault",
            };
            match failure.phase {
                Some(phase) => {
                    output.push_str(&format!(
                        "      {kind} in {phase}: {}\n",
                        failure.message
                    ));
                }
                None => {
                    output.push_str(&format!("      {kind}: {}\n", failure.message));
                }
            }
        }
    }

    let failed = outcome.failed_runs().count();
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  {} runs: {} succeeded, {} failed\n",
        outcome.runs.len(),
        outcome.runs.len() - failed,
        failed
    ));
    output.push_str(&format!(
        "  Overall: {}\n",
        if outcome.succeeded() {
            "Succeeded"
        } else {
            "Failed"
        }
    ));
    output.push_str(&format!("  Output: {}\n", outcome.output_path.display()));

    output
}

/// Persist the outcome as pretty-printed JSON at `path`.
pub fn write_summary_json(path: &Path, outcome: &ExperimentOutcome) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(outcome)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(&json)
}
