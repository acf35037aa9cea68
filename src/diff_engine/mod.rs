//! The Diff Engine (C5): walks a matched pair of [`NormalizedPolicy`]
//! values in fixed declaration order and produces a deterministically
//! sorted list of [`Difference`]s.

use serde_json::Value;

use crate::model::{DiffKind, Difference, NormalizedPolicy};

/// Compute the full difference list for a matched pair. Returns an empty
/// list (and a caller should treat the pair as identical/semantically
/// equivalent) when the two canonical forms are equal.
pub fn diff_policies(left: &NormalizedPolicy, right: &NormalizedPolicy) -> Vec<Difference> {
    let mut diffs = Vec::new();

    diff_scalar("id", &Value::String(left.id.clone()), &Value::String(right.id.clone()), &mut diffs);
    diff_scalar(
        "displayName",
        &Value::String(left.display_name.clone()),
        &Value::String(right.display_name.clone()),
        &mut diffs,
    );
    diff_scalar(
        "state",
        &serde_json::to_value(left.state).unwrap_or(Value::Null),
        &serde_json::to_value(right.state).unwrap_or(Value::Null),
        &mut diffs,
    );

    diff_optional_record(
        "conditions",
        left.conditions.as_ref().map(|c| serde_json::to_value(c).unwrap_or(Value::Null)),
        right.conditions.as_ref().map(|c| serde_json::to_value(c).unwrap_or(Value::Null)),
        &mut diffs,
    );
    diff_optional_record(
        "grantControls",
        left.grant_controls
            .as_ref()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null)),
        right
            .grant_controls
            .as_ref()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null)),
        &mut diffs,
    );
    diff_optional_record(
        "sessionControls",
        left.session_controls
            .as_ref()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null)),
        right
            .session_controls
            .as_ref()
            .map(|c| serde_json::to_value(c).unwrap_or(Value::Null)),
        &mut diffs,
    );

    diffs.sort_by(|a, b| {
        let (a_left, a_right) = diff_values(&a.kind);
        let (b_left, b_right) = diff_values(&b.kind);
        (a.path.as_str(), kind_ordinal(&a.kind), a_left, a_right).cmp(&(
            b.path.as_str(),
            kind_ordinal(&b.kind),
            b_left,
            b_right,
        ))
    });

    diffs
}

fn kind_ordinal(kind: &DiffKind) -> u8 {
    match kind {
        DiffKind::Modified { .. } => 0,
        DiffKind::Added { .. } => 1,
        DiffKind::Removed { .. } => 2,
        DiffKind::TypeChanged { .. } => 3,
    }
}

fn diff_values(kind: &DiffKind) -> (String, String) {
    match kind {
        DiffKind::Modified { before, after } => (before.to_string(), after.to_string()),
        DiffKind::Added { value } => (String::new(), value.to_string()),
        DiffKind::Removed { value } => (value.to_string(), String::new()),
        DiffKind::TypeChanged { before, after } => (before.to_string(), after.to_string()),
    }
}

fn diff_scalar(path: &str, left: &Value, right: &Value, diffs: &mut Vec<Difference>) {
    if left != right {
        diffs.push(Difference {
            path: path.to_string(),
            kind: DiffKind::Modified {
                before: left.clone(),
                after: right.clone(),
            },
            classification: None,
        });
    }
}

/// Diff an optional nested record (`conditions`, `grantControls`,
/// `sessionControls`). Present-on-one-side-only emits a single
/// added/removed diff for the whole record; otherwise recurse field by
/// field.
fn diff_optional_record(
    path: &str,
    left: Option<Value>,
    right: Option<Value>,
    diffs: &mut Vec<Difference>,
) {
    match (left, right) {
        (None, None) => {}
        (Some(l), None) => diffs.push(Difference {
            path: path.to_string(),
            kind: DiffKind::Removed { value: l },
            classification: None,
        }),
        (None, Some(r)) => diffs.push(Difference {
            path: path.to_string(),
            kind: DiffKind::Added { value: r },
            classification: None,
        }),
        (Some(l), Some(r)) => diff_value_tree(path, &l, &r, diffs),
    }
}

/// Recursively diff two JSON object trees field by field, using the
/// §4.5 rules for scalars, sequences (set semantics), nested objects,
/// and type mismatches.
fn diff_value_tree(path: &str, left: &Value, right: &Value, diffs: &mut Vec<Difference>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut keys: Vec<&String> = l.keys().chain(r.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child_path = format!("{path}.{key}");
                match (l.get(key), r.get(key)) {
                    (Some(lv), Some(rv)) => diff_value_tree(&child_path, lv, rv, diffs),
                    (Some(lv), None) if !is_absent(lv) => diffs.push(Difference {
                        path: child_path,
                        kind: DiffKind::Removed { value: lv.clone() },
                        classification: None,
                    }),
                    (None, Some(rv)) if !is_absent(rv) => diffs.push(Difference {
                        path: child_path,
                        kind: DiffKind::Added { value: rv.clone() },
                        classification: None,
                    }),
                    _ => {}
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            for value in r.iter().filter(|v| !l.contains(v)) {
                diffs.push(Difference {
                    path: path.to_string(),
                    kind: DiffKind::Added { value: value.clone() },
                    classification: None,
                });
            }
            for value in l.iter().filter(|v| !r.contains(v)) {
                diffs.push(Difference {
                    path: path.to_string(),
                    kind: DiffKind::Removed { value: value.clone() },
                    classification: None,
                });
            }
        }
        (l, r) if is_absent(l) && is_absent(r) => {}
        (l, r) if std::mem::discriminant(l) == std::mem::discriminant(r) => {
            if l != r {
                diffs.push(Difference {
                    path: path.to_string(),
                    kind: DiffKind::Modified {
                        before: l.clone(),
                        after: r.clone(),
                    },
                    classification: None,
                });
            }
        }
        (l, r) => diffs.push(Difference {
            path: path.to_string(),
            kind: DiffKind::TypeChanged {
                before: l.clone(),
                after: r.clone(),
            },
            classification: None,
        }),
    }
}

/// Null, empty array, and absent are equivalent per C1; treat accordingly.
fn is_absent(value: &Value) -> bool {
    matches!(value, Value::Null) || matches!(value, Value::Array(items) if items.is_empty())
}
