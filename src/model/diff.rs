//! Path-addressed differences between two [`NormalizedPolicy`] values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::policy::NormalizedPolicy;

/// The shape of a single field-level change. Fixed to the four-member
/// vocabulary: a sequence field's added/removed elements surface as one
/// `Added`/`Removed` diff per element, all sharing the field's path, not
/// as a single bundled variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiffKind {
    /// A scalar field changed value.
    Modified { before: Value, after: Value },
    /// A field, or one sequence element, present on one side only.
    Added { value: Value },
    Removed { value: Value },
    /// The same path held values of two different JSON types.
    TypeChanged { before: Value, after: Value },
}

/// One change at a specific dotted path within a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub path: String,
    #[serde(flatten)]
    pub kind: DiffKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// The significance assigned to a [`Difference`] by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    Critical,
    NonCritical,
    Ignored,
}

/// How a policy in the baseline relates to the corresponding live policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyStatus {
    Identical,
    SemanticallyEquivalent,
    Differ,
    LeftOnly,
    RightOnly,
}

/// The full comparison outcome for a single matched (or unmatched) policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyComparison {
    pub policy_id: String,
    pub display_name: String,
    pub status: PolicyStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<Difference>,
    #[serde(skip)]
    pub baseline: Option<NormalizedPolicy>,
    #[serde(skip)]
    pub live: Option<NormalizedPolicy>,
}

impl PolicyComparison {
    pub fn has_critical(&self) -> bool {
        self.differences
            .iter()
            .any(|d| d.classification == Some(Classification::Critical))
    }

    pub fn has_non_critical(&self) -> bool {
        self.differences
            .iter()
            .any(|d| d.classification == Some(Classification::NonCritical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(path: &str, classification: Classification) -> Difference {
        Difference {
            path: path.to_string(),
            kind: DiffKind::Modified {
                before: Value::Bool(true),
                after: Value::Bool(false),
            },
            classification: Some(classification),
        }
    }

    #[test]
    fn has_critical_detects_any_critical_difference() {
        let comparison = PolicyComparison {
            policy_id: "p1".to_string(),
            display_name: "Policy 1".to_string(),
            status: PolicyStatus::Differ,
            differences: vec![
                diff("state", Classification::NonCritical),
                diff("grantControls.operator", Classification::Critical),
            ],
            baseline: None,
            live: None,
        };
        assert!(comparison.has_critical());
        assert!(comparison.has_non_critical());
    }

    #[test]
    fn identical_comparison_has_no_findings() {
        let comparison = PolicyComparison {
            policy_id: "p1".to_string(),
            display_name: "Policy 1".to_string(),
            status: PolicyStatus::Identical,
            differences: Vec::new(),
            baseline: None,
            live: None,
        };
        assert!(!comparison.has_critical());
        assert!(!comparison.has_non_critical());
    }
}
