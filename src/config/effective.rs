//! Effective configuration with full provenance.
//!
//! Builds the merged `ClassificationConfig` from the builtin → host →
//! repo → CLI layer chain, tracking where each contributing layer came
//! from, redacting secret-looking keys, and validating the merged
//! result — following the teacher's `EffectiveConfig::build` shape.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::classify::ClassificationConfig as ClassifierConfig;
use crate::matcher::{MatchingOptions, MatchingStrategy};

pub const SCHEMA_VERSION: u32 = 1;
pub const SCHEMA_ID: &str = "policy-drift/effective_config@1";

const SECRET_KEYS: &[&str] = &["token", "secret", "password", "credential", "clientSecret"];

/// Origin of a configuration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

/// A contributing config source with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Configuration-layer errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// The merged, provenance-tracked configuration driving C4/C6/C7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub config: Value,
    pub sources: Vec<ConfigSource>,
    pub redactions: Vec<String>,
}

impl EffectiveConfig {
    /// Build the merged config from the four layers. `host_config_path`
    /// and `repo_config_path` are silently skipped when absent on disk.
    pub fn build(
        host_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        }];

        if let Some(path) = host_config_path {
            if path.exists() {
                layers.push(Self::load_toml_file(path)?);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                });
            }
        }

        if let Some(path) = repo_config_path {
            if path.exists() {
                layers.push(Self::load_toml_file(path)?);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Repo,
                    path: Some(path.to_string_lossy().to_string()),
                });
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        let mut merged = merge_layers(layers);
        let redactions = Self::redact_secrets(&mut merged);
        Self::validate(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
        })
    }

    fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let toml_value: toml::Value =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::toml_to_json(toml_value))
    }

    fn toml_to_json(value: toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => {
                serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            }
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::Array(items.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => {
                let map: serde_json::Map<String, Value> = table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect();
                Value::Object(map)
            }
        }
    }

    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        Self::redact_recursive(value, String::new(), &mut redactions);
        redactions
    }

    fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let current_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    let key_lower = key.to_lowercase();
                    let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(&s.to_lowercase()));
                    if is_secret && !val.is_object() && !val.is_array() {
                        *val = Value::String("[REDACTED]".to_string());
                        redactions.push(current_path);
                    } else {
                        Self::redact_recursive(val, current_path, redactions);
                    }
                }
            }
            Value::Array(items) => {
                for (i, val) in items.iter_mut().enumerate() {
                    Self::redact_recursive(val, format!("{path}[{i}]"), redactions);
                }
            }
            _ => {}
        }
    }

    fn validate(config: &Value) -> Result<(), ConfigError> {
        if let Some(strategy) = config.get("matching").and_then(|m| m.get("strategy")).and_then(Value::as_str) {
            if !["byName", "byId", "customMapping"].contains(&strategy) {
                return Err(ConfigError::Validation(format!(
                    "unknown matching strategy '{strategy}'"
                )));
            }
        }
        if let Some(max) = config.get("maxDifferences").and_then(Value::as_i64) {
            if max < 0 {
                return Err(ConfigError::Validation(
                    "maxDifferences must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("serialization failed: {e}"))
        })?;
        fs::write(path, json)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Project the merged config into the matcher's options struct.
    pub fn matching_options(&self) -> (MatchingStrategy, MatchingOptions) {
        let strategy = match self.get_str("matching.strategy") {
            Some("byId") => MatchingStrategy::ById,
            Some("customMapping") => MatchingStrategy::CustomMapping,
            _ => MatchingStrategy::ByName,
        };
        let options = MatchingOptions {
            strategy_case_sensitive: self.get_bool("matching.caseSensitive").unwrap_or(false),
            custom_mapping: Default::default(),
        };
        (strategy, options)
    }

    /// Project the merged config into the classifier's config struct.
    pub fn classification_config(&self) -> ClassifierConfig {
        let str_list = |path: &str| -> Vec<String> {
            self.get(path)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default()
        };
        ClassifierConfig {
            fail_on_change_types: str_list("failOnChangeTypes"),
            ignore_change_types: str_list("ignoreChangeTypes"),
        }
    }

    pub fn exit_on_differences(&self) -> bool {
        self.get_bool("exitOnDifferences").unwrap_or(false)
    }

    pub fn max_differences(&self) -> Option<usize> {
        self.get("maxDifferences").and_then(Value::as_u64).map(|n| n as usize)
    }

    pub fn jobs(&self) -> Option<usize> {
        self.get("jobs").and_then(Value::as_u64).map(|n| n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None, None).unwrap();
        assert_eq!(config.get_str("matching.strategy"), Some("byName"));
        assert_eq!(config.get_bool("exitOnDifferences"), Some(false));
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let cli = serde_json::json!({"exitOnDifferences": true});
        let config = EffectiveConfig::build(None, None, Some(cli)).unwrap();
        assert_eq!(config.get_bool("exitOnDifferences"), Some(true));
    }

    #[test]
    fn invalid_matching_strategy_is_rejected() {
        let cli = serde_json::json!({"matching": {"strategy": "bogus"}});
        let result = EffectiveConfig::build(None, None, Some(cli));
        assert!(result.is_err());
    }

    #[test]
    fn secret_like_keys_are_redacted() {
        let cli = serde_json::json!({"auth": {"clientSecret": "shh", "tenantId": "visible"}});
        let config = EffectiveConfig::build(None, None, Some(cli)).unwrap();
        assert_eq!(config.get_str("auth.clientSecret"), Some("[REDACTED]"));
        assert_eq!(config.get_str("auth.tenantId"), Some("visible"));
        assert!(config.redactions.contains(&"auth.clientSecret".to_string()));
    }

    #[test]
    fn host_and_repo_toml_layers_merge_in_precedence_order() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "exitOnDifferences = false").unwrap();
        let mut repo = NamedTempFile::new().unwrap();
        writeln!(repo, "exitOnDifferences = true").unwrap();

        let config = EffectiveConfig::build(Some(host.path()), Some(repo.path()), None).unwrap();
        assert_eq!(config.get_bool("exitOnDifferences"), Some(true));
        assert_eq!(config.sources.len(), 3);
    }
}
