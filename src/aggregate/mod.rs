//! The Outcome Aggregator (C7): turns classified per-pair diff lists
//! into per-policy statuses, a run-wide [`Summary`], and the pipeline
//! exit code.

use crate::model::{
    compute_outcome, Classification, ComparisonResult, Difference, ExitInputs, NormalizedPolicy,
    PipelineStatus, PolicyComparison, PolicyStatus, Summary, ThresholdConfiguration,
};

/// One matched pair's classified result, ready for aggregation.
pub struct ClassifiedPair {
    pub left: NormalizedPolicy,
    pub right: NormalizedPolicy,
    pub differences: Vec<Difference>,
    pub critical_change_types: Vec<String>,
}

/// Options controlling the exit-code rule (§4.7).
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    pub max_differences: Option<usize>,
    pub exit_on_differences: bool,
    pub fail_on_change_types: Vec<String>,
    pub ignore_change_types: Vec<String>,
}

fn surfaced(diffs: &[Difference]) -> Vec<&Difference> {
    diffs
        .iter()
        .filter(|d| d.classification != Some(Classification::Ignored))
        .collect()
}

/// Build the final [`ComparisonResult`] from matched pairs and orphans.
/// `compared_at` and `tenant_id` are supplied by the caller since this
/// function must stay free of wall-clock and I/O side effects.
pub fn aggregate(
    pairs: Vec<ClassifiedPair>,
    left_only: Vec<NormalizedPolicy>,
    right_only: Vec<NormalizedPolicy>,
    options: AggregationOptions,
    compared_at: String,
    tenant_id: String,
) -> ComparisonResult {
    let mut comparisons = Vec::new();
    let mut critical_count = 0;
    let mut non_critical_count = 0;
    let mut critical_change_types: Vec<String> = Vec::new();
    let mut policies_with_critical_diffs: Vec<String> = Vec::new();

    let mut identical = 0;
    let mut semantically_equivalent = 0;
    let mut differ = 0;

    for pair in pairs {
        let visible = surfaced(&pair.differences);
        let has_critical = visible.iter().any(|d| d.classification == Some(Classification::Critical));
        let has_non_critical = visible
            .iter()
            .any(|d| d.classification == Some(Classification::NonCritical));

        let status = if visible.is_empty() {
            if pair.left.source_format != pair.right.source_format {
                semantically_equivalent += 1;
                PolicyStatus::SemanticallyEquivalent
            } else {
                identical += 1;
                PolicyStatus::Identical
            }
        } else {
            differ += 1;
            PolicyStatus::Differ
        };

        if has_critical {
            critical_count += visible
                .iter()
                .filter(|d| d.classification == Some(Classification::Critical))
                .count();
            policies_with_critical_diffs.push(pair.left.display_name.clone());
            for t in &pair.critical_change_types {
                if !critical_change_types.contains(t) {
                    critical_change_types.push(t.clone());
                }
            }
        }
        if has_non_critical {
            non_critical_count += visible
                .iter()
                .filter(|d| d.classification == Some(Classification::NonCritical))
                .count();
        }

        let policy_id = if pair.left.id.is_empty() {
            pair.left.display_name.clone()
        } else {
            pair.left.id.clone()
        };

        comparisons.push(PolicyComparison {
            policy_id,
            display_name: pair.left.display_name.clone(),
            status,
            differences: pair.differences,
            baseline: Some(pair.left),
            live: Some(pair.right),
        });
    }

    let orphan_count = left_only.len() + right_only.len();

    for policy in left_only {
        comparisons.push(PolicyComparison {
            policy_id: if policy.id.is_empty() { policy.display_name.clone() } else { policy.id.clone() },
            display_name: policy.display_name.clone(),
            status: PolicyStatus::LeftOnly,
            differences: Vec::new(),
            baseline: Some(policy),
            live: None,
        });
    }
    for policy in right_only {
        comparisons.push(PolicyComparison {
            policy_id: if policy.id.is_empty() { policy.display_name.clone() } else { policy.id.clone() },
            display_name: policy.display_name.clone(),
            status: PolicyStatus::RightOnly,
            differences: Vec::new(),
            baseline: None,
            live: Some(policy),
        });
    }

    comparisons.sort_by(|a, b| {
        (status_bucket(a.status), a.display_name.to_ascii_lowercase())
            .cmp(&(status_bucket(b.status), b.display_name.to_ascii_lowercase()))
    });

    critical_change_types.sort();
    policies_with_critical_diffs.sort();

    let summary = Summary {
        total_policies: comparisons.len(),
        identical,
        semantically_equivalent,
        differ,
        left_only: orphan_left_count(&comparisons),
        right_only: orphan_right_count(&comparisons),
        critical_changes: critical_count,
        non_critical_changes: non_critical_count,
        critical_change_types,
        policies_with_critical_diffs,
    };

    let (status, exit_code) = compute_outcome(ExitInputs {
        critical_count,
        non_critical_count,
        orphan_count,
        max_differences: options.max_differences,
        exit_on_differences: options.exit_on_differences,
    });

    let message = describe(status, &summary);

    ComparisonResult {
        comparisons,
        summary,
        status: status.as_str().to_string(),
        exit_code,
        compared_at,
        tenant_id,
        message,
        threshold_configuration: ThresholdConfiguration {
            max_differences: options.max_differences,
            fail_on_types: options.fail_on_change_types,
            ignore_types: options.ignore_change_types,
        },
    }
}

fn orphan_left_count(comparisons: &[PolicyComparison]) -> usize {
    comparisons.iter().filter(|c| c.status == PolicyStatus::LeftOnly).count()
}

fn orphan_right_count(comparisons: &[PolicyComparison]) -> usize {
    comparisons.iter().filter(|c| c.status == PolicyStatus::RightOnly).count()
}

/// Bucket order per §5: leftOnly, rightOnly, differ, semanticallyEquivalent,
/// identical.
fn status_bucket(status: PolicyStatus) -> u8 {
    match status {
        PolicyStatus::LeftOnly => 0,
        PolicyStatus::RightOnly => 1,
        PolicyStatus::Differ => 2,
        PolicyStatus::SemanticallyEquivalent => 3,
        PolicyStatus::Identical => 4,
    }
}

fn describe(status: PipelineStatus, summary: &Summary) -> String {
    match status {
        PipelineStatus::NoDrift => "no drift detected".to_string(),
        PipelineStatus::DifferencesFound => {
            format!("{} non-critical difference(s) found", summary.non_critical_changes)
        }
        PipelineStatus::CriticalDriftDetected => {
            format!("{} critical difference(s) found", summary.critical_changes)
        }
        PipelineStatus::ThresholdExceeded => "difference threshold exceeded".to_string(),
        PipelineStatus::Error => "comparison failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiffKind, PolicyState, SourceFormat};
    use serde_json::Value;

    fn policy(name: &str, format: SourceFormat) -> NormalizedPolicy {
        NormalizedPolicy {
            id: String::new(),
            display_name: name.to_string(),
            state: PolicyState::Enabled,
            source_format: format,
            source_ref: "mem".to_string(),
            conditions: None,
            grant_controls: None,
            session_controls: None,
            raw: Value::Null,
        }
    }

    fn diff(classification: Classification) -> Difference {
        Difference {
            path: "state".to_string(),
            kind: DiffKind::Modified {
                before: Value::Bool(true),
                after: Value::Bool(false),
            },
            classification: Some(classification),
        }
    }

    #[test]
    fn identical_pair_is_unchanged_with_zero_exit_code() {
        let pairs = vec![ClassifiedPair {
            left: policy("A", SourceFormat::Json),
            right: policy("A", SourceFormat::Json),
            differences: Vec::new(),
            critical_change_types: Vec::new(),
        }];
        let result = aggregate(
            pairs,
            Vec::new(),
            Vec::new(),
            AggregationOptions { max_differences: None, exit_on_differences: true, ..Default::default() },
            "now".to_string(),
            String::new(),
        );
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.comparisons[0].status, PolicyStatus::Identical);
    }

    #[test]
    fn cross_dialect_identical_pair_is_semantically_equivalent() {
        let pairs = vec![ClassifiedPair {
            left: policy("A", SourceFormat::Json),
            right: policy("A", SourceFormat::Hcl),
            differences: Vec::new(),
            critical_change_types: Vec::new(),
        }];
        let result = aggregate(
            pairs,
            Vec::new(),
            Vec::new(),
            AggregationOptions { max_differences: None, exit_on_differences: true, ..Default::default() },
            "now".to_string(),
            String::new(),
        );
        assert_eq!(result.summary.semantically_equivalent, 1);
    }

    #[test]
    fn critical_diff_drives_exit_code_two() {
        let pairs = vec![ClassifiedPair {
            left: policy("A", SourceFormat::Json),
            right: policy("A", SourceFormat::Json),
            differences: vec![diff(Classification::Critical)],
            critical_change_types: vec!["state".to_string()],
        }];
        let result = aggregate(
            pairs,
            Vec::new(),
            Vec::new(),
            AggregationOptions { max_differences: None, exit_on_differences: true, ..Default::default() },
            "now".to_string(),
            String::new(),
        );
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.status, "criticalDriftDetected");
    }

    #[test]
    fn orphans_count_as_non_critical_for_threshold() {
        let result = aggregate(
            Vec::new(),
            vec![policy("LeftOnly", SourceFormat::Json)],
            Vec::new(),
            AggregationOptions { max_differences: None, exit_on_differences: true, ..Default::default() },
            "now".to_string(),
            String::new(),
        );
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.summary.left_only, 1);
    }
}
