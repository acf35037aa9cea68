//! The Policy Matcher (C4): pairs baseline and live policies by one of
//! several strategies, using hashed lookup to stay linear in the
//! number of policies (§5).

use std::collections::HashMap;

use crate::model::NormalizedPolicy;

/// Which field links a baseline policy to its live counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingStrategy {
    ByName,
    ById,
    CustomMapping,
}

/// Options controlling a single matcher run.
#[derive(Debug, Clone, Default)]
pub struct MatchingOptions {
    pub strategy_case_sensitive: bool,
    /// Only consulted for `MatchingStrategy::CustomMapping`.
    pub custom_mapping: HashMap<String, String>,
}

/// A non-fatal anomaly observed while matching (e.g. a duplicate name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchWarning {
    pub message: String,
}

/// The output of a match run: every input policy appears in exactly one
/// bucket.
pub struct MatchResult {
    pub matched: Vec<(NormalizedPolicy, NormalizedPolicy)>,
    pub left_only: Vec<NormalizedPolicy>,
    pub right_only: Vec<NormalizedPolicy>,
    pub warnings: Vec<MatchWarning>,
}

fn fold_case(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        value.to_ascii_lowercase()
    }
}

/// Match `left` (baseline) against `right` (live) policies using
/// `strategy`.
pub fn match_policies(
    left: Vec<NormalizedPolicy>,
    right: Vec<NormalizedPolicy>,
    strategy: MatchingStrategy,
    options: &MatchingOptions,
) -> MatchResult {
    match strategy {
        MatchingStrategy::ByName => match_by_key(left, right, options.strategy_case_sensitive, |p| {
            Some(p.display_name.clone())
        }),
        MatchingStrategy::ById => match_by_key(left, right, true, |p| {
            if p.id.is_empty() {
                None
            } else {
                Some(p.id.clone())
            }
        }),
        MatchingStrategy::CustomMapping => match_custom(left, right, options),
    }
}

fn match_by_key(
    left: Vec<NormalizedPolicy>,
    right: Vec<NormalizedPolicy>,
    case_sensitive: bool,
    key_of: impl Fn(&NormalizedPolicy) -> Option<String>,
) -> MatchResult {
    let mut warnings = Vec::new();
    let mut right_by_key: HashMap<String, Vec<NormalizedPolicy>> = HashMap::new();
    for policy in right {
        if let Some(key) = key_of(&policy) {
            right_by_key
                .entry(fold_case(&key, case_sensitive))
                .or_default()
                .push(policy);
        } else {
            right_by_key.entry(String::new()).or_default().push(policy);
        }
    }

    let mut matched = Vec::new();
    let mut left_only = Vec::new();
    let mut seen_keys: HashMap<String, usize> = HashMap::new();

    for policy in left {
        let Some(raw_key) = key_of(&policy) else {
            left_only.push(policy);
            continue;
        };
        let key = fold_case(&raw_key, case_sensitive);
        let count = seen_keys.entry(key.clone()).or_insert(0);
        if *count > 0 {
            warnings.push(MatchWarning {
                message: format!("duplicate match key '{raw_key}' on baseline side"),
            });
        }

        if let Some(candidates) = right_by_key.get_mut(&key) {
            if !candidates.is_empty() && !key.is_empty() {
                let counterpart = candidates.remove(0);
                matched.push((policy, counterpart));
                *count += 1;
                continue;
            }
        }
        left_only.push(policy);
        *count += 1;
    }

    let right_only: Vec<NormalizedPolicy> = right_by_key.into_values().flatten().collect();

    MatchResult {
        matched,
        left_only,
        right_only,
        warnings,
    }
}

fn match_custom(
    left: Vec<NormalizedPolicy>,
    right: Vec<NormalizedPolicy>,
    options: &MatchingOptions,
) -> MatchResult {
    let mut right_by_name: HashMap<String, Vec<NormalizedPolicy>> = HashMap::new();
    for policy in right {
        right_by_name
            .entry(policy.display_name.clone())
            .or_default()
            .push(policy);
    }

    let mut matched = Vec::new();
    let mut left_only = Vec::new();

    for policy in left {
        let mapped_name = options.custom_mapping.get(&policy.display_name);
        let candidate = mapped_name.and_then(|name| right_by_name.get_mut(name));
        match candidate {
            Some(candidates) if !candidates.is_empty() => {
                let counterpart = candidates.remove(0);
                matched.push((policy, counterpart));
            }
            _ => left_only.push(policy),
        }
    }

    let right_only: Vec<NormalizedPolicy> = right_by_name.into_values().flatten().collect();

    MatchResult {
        matched,
        left_only,
        right_only,
        warnings: Vec::new(),
    }
}
