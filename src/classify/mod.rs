//! The Change Classifier (C6): tags each [`Difference`] with a
//! `changeType` and a [`Classification`], applying user overrides with
//! `ignore > failOn > built-in` precedence (the Open Question resolution
//! recorded in DESIGN.md).

use crate::model::{Classification, Difference};

const CRITICAL_PREFIXES: &[&str] = &[
    "grantControls",
    "sessionControls",
    "state",
    "conditions.signInRiskLevels",
    "conditions.userRiskLevels",
    "conditions.applications",
    "conditions.users",
];

const NON_CRITICAL_PREFIXES: &[&str] = &[
    "createdDateTime",
    "modifiedDateTime",
    "id",
    "description",
    "displayName",
];

/// User-configurable classification overrides.
#[derive(Debug, Clone, Default)]
pub struct ClassificationConfig {
    pub fail_on_change_types: Vec<String>,
    pub ignore_change_types: Vec<String>,
}

/// The longest matching prefix is the change type; ties can't occur
/// because prefixes are compared by length, longest first.
fn change_type_for(path: &str, tables: &[&[&str]]) -> Option<String> {
    let mut best: Option<&str> = None;
    for table in tables {
        for prefix in *table {
            let longer = match best {
                Some(b) => prefix.len() > b.len(),
                None => true,
            };
            if is_prefix_match(path, prefix) && longer {
                best = Some(prefix);
            }
        }
    }
    best.map(str::to_string)
}

fn is_prefix_match(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}."))
}

/// Classify one difference in place, setting both `changeType` tracking
/// (returned alongside) and `classification`.
pub fn classify_difference(mut diff: Difference, config: &ClassificationConfig) -> (Difference, String) {
    let change_type = change_type_for(&diff.path, &[CRITICAL_PREFIXES, NON_CRITICAL_PREFIXES])
        .unwrap_or_else(|| diff.path.clone());

    let ignored = config
        .ignore_change_types
        .iter()
        .any(|p| is_prefix_match(&change_type, p) || is_prefix_match(&diff.path, p));
    let failed_on = config
        .fail_on_change_types
        .iter()
        .any(|p| is_prefix_match(&change_type, p) || is_prefix_match(&diff.path, p));
    let built_in_critical = CRITICAL_PREFIXES
        .iter()
        .any(|p| is_prefix_match(&diff.path, p));

    let classification = if ignored {
        Classification::Ignored
    } else if failed_on {
        Classification::Critical
    } else if built_in_critical {
        Classification::Critical
    } else if NON_CRITICAL_PREFIXES.iter().any(|p| is_prefix_match(&diff.path, p)) {
        Classification::NonCritical
    } else {
        Classification::NonCritical
    };

    diff.classification = Some(classification);
    (diff, change_type)
}

/// Classify a whole diff list, returning the classified diffs plus the
/// distinct critical change-type keys observed.
pub fn classify_all(
    diffs: Vec<Difference>,
    config: &ClassificationConfig,
) -> (Vec<Difference>, Vec<String>) {
    let mut critical_types = Vec::new();
    let classified: Vec<Difference> = diffs
        .into_iter()
        .map(|d| {
            let (classified, change_type) = classify_difference(d, config);
            if classified.classification == Some(Classification::Critical)
                && !critical_types.contains(&change_type)
            {
                critical_types.push(change_type);
            }
            classified
        })
        .collect();
    critical_types.sort();
    (classified, critical_types)
}
