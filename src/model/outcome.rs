//! Aggregate run outcome: per-run summary, pipeline status, and exit code.

use serde::{Deserialize, Serialize};

use super::diff::PolicyComparison;

/// Pipeline-wide status label, reported alongside the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStatus {
    NoDrift,
    DifferencesFound,
    CriticalDriftDetected,
    ThresholdExceeded,
    Error,
}

impl PipelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::NoDrift => "noDrift",
            PipelineStatus::DifferencesFound => "differencesFound",
            PipelineStatus::CriticalDriftDetected => "criticalDriftDetected",
            PipelineStatus::ThresholdExceeded => "thresholdExceeded",
            PipelineStatus::Error => "error",
        }
    }
}

/// Aggregate counters over all compared policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_policies: usize,
    pub identical: usize,
    pub semantically_equivalent: usize,
    pub differ: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub critical_changes: usize,
    pub non_critical_changes: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critical_change_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies_with_critical_diffs: Vec<String>,
}

/// The inputs that the exit-code rule in §4.7 is a pure function of.
#[derive(Debug, Clone, Copy)]
pub struct ExitInputs {
    pub critical_count: usize,
    pub non_critical_count: usize,
    pub orphan_count: usize,
    pub max_differences: Option<usize>,
    pub exit_on_differences: bool,
}

/// Compute `(status, exit_code)` per the table in §4.7. Pure function of
/// [`ExitInputs`]; no other state may influence the result.
pub fn compute_outcome(inputs: ExitInputs) -> (PipelineStatus, i32) {
    let total_non_ignored = inputs.non_critical_count + inputs.orphan_count;

    let (status, code) = if inputs.critical_count > 0 {
        (PipelineStatus::CriticalDriftDetected, 2)
    } else if inputs
        .max_differences
        .is_some_and(|max| total_non_ignored > max)
    {
        (PipelineStatus::ThresholdExceeded, 2)
    } else if total_non_ignored > 0 {
        (PipelineStatus::DifferencesFound, 1)
    } else {
        (PipelineStatus::NoDrift, 0)
    };

    if !inputs.exit_on_differences {
        return (status, 0);
    }
    (status, code)
}

/// The threshold/classification-override configuration the run was
/// executed with, echoed back in the `pipelineJson` report so a CI
/// consumer can see what produced a given exit code without needing the
/// original config files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfiguration {
    pub max_differences: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fail_on_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_types: Vec<String>,
}

/// The full result of a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub comparisons: Vec<PolicyComparison>,
    pub summary: Summary,
    pub status: String,
    pub exit_code: i32,
    pub compared_at: String,
    #[serde(default)]
    pub tenant_id: String,
    pub message: String,
    #[serde(default)]
    pub threshold_configuration: ThresholdConfiguration,
}
