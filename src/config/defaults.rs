//! Built-in configuration defaults (layer 1).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Hardcoded defaults for every configurable knob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    pub matching_strategy: String,
    pub case_sensitive: bool,
    pub exit_on_differences: bool,
    pub max_differences: Option<usize>,
    pub continue_on_error: bool,
    pub jobs: Option<usize>,
    pub formats: Vec<String>,
    pub fail_on_change_types: Vec<String>,
    pub ignore_change_types: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            matching_strategy: "byName".to_string(),
            case_sensitive: false,
            exit_on_differences: false,
            max_differences: None,
            continue_on_error: true,
            jobs: None,
            formats: vec!["console".to_string()],
            fail_on_change_types: Vec::new(),
            ignore_change_types: Vec::new(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a JSON value for layer merging.
    pub fn to_value(&self) -> Value {
        json!({
            "matching": {
                "strategy": self.matching_strategy,
                "caseSensitive": self.case_sensitive,
            },
            "exitOnDifferences": self.exit_on_differences,
            "maxDifferences": self.max_differences,
            "continueOnError": self.continue_on_error,
            "jobs": self.jobs,
            "formats": self.formats,
            "failOnChangeTypes": self.fail_on_change_types,
            "ignoreChangeTypes": self.ignore_change_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.matching_strategy, "byName");
        assert!(!defaults.case_sensitive);
        assert!(!defaults.exit_on_differences);
    }
}
