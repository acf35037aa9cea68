//! Policy loaders: the JSON export/directory loader (C2) and the HCL
//! directory loader (C3). Both delegate final assembly to
//! [`assemble_policy`] so the two dialects normalize identically.

mod hcl_loader;
mod json_loader;

pub use hcl_loader::load_hcl;
pub use json_loader::{load_json, load_json_envelope};

use serde_json::Value;
use thiserror::Error;

use crate::model::{
    ApplicationEnforcedRestrictions, Applications, CloudAppSecurity, Conditions, GrantControls,
    GrantOperator, IncludeExclude, NormalizedPolicy, PersistentBrowser, PolicyState,
    SessionControls, SignInFrequency, SourceFormat, Users,
};
use crate::normalize::{
    canonicalize_sequence, normalize_built_in_control, normalize_client_app_type,
    normalize_lowercase_token, normalize_state, NormalizeWarning,
};

/// A non-fatal anomaly surfaced while loading one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub source_ref: String,
    pub message: String,
}

/// Fatal errors raised by a loader.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'{source_ref}' has a shape that is neither an export envelope nor a policy object")]
    InvalidDocument { source_ref: String },
    #[error("failed to read '{source_ref}': {message}")]
    Io {
        source_ref: String,
        message: String,
    },
    #[error("'{source_ref}' contains invalid syntax: {message}")]
    Syntax {
        source_ref: String,
        message: String,
    },
}

impl LoadError {
    pub fn exit_code(&self) -> i32 {
        3
    }
}

/// The result of loading a batch of documents: the policies collected so
/// far plus any warnings. A directory load with per-file errors still
/// returns `Ok`; only a load of the single required live document raises
/// [`LoadError`] to the caller.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub policies: Vec<NormalizedPolicy>,
    pub warnings: Vec<LoadWarning>,
}

/// Build a [`NormalizedPolicy`] from a generic JSON `Value` tree, applying
/// C1 canonicalization to every enum-like field along the way. Both the
/// JSON loader and the HCL loader (after converting their native tree to
/// a `Value`) funnel through here so dialect differences never leak past
/// this point.
pub fn assemble_policy(
    value: &Value,
    source_format: SourceFormat,
    source_ref: &str,
    warnings: &mut Vec<LoadWarning>,
) -> NormalizedPolicy {
    let mut norm_warnings: Vec<NormalizeWarning> = Vec::new();
    let obj = value.as_object();

    let get_str = |key: &str| -> String {
        obj.and_then(|o| case_insensitive_get(o, key))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    let id = get_str("id");
    let display_name = get_str("displayName");
    let state_raw = get_str("state");
    let state = match normalize_state(&state_raw, &mut norm_warnings).as_str() {
        "enabled" => PolicyState::Enabled,
        "reportOnly" => PolicyState::ReportOnly,
        _ => PolicyState::Disabled,
    };

    let conditions = obj
        .and_then(|o| case_insensitive_get(o, "conditions"))
        .map(|v| build_conditions(v, &mut norm_warnings));
    let grant_controls = obj
        .and_then(|o| case_insensitive_get(o, "grantControls"))
        .map(|v| build_grant_controls(v, &mut norm_warnings));
    let session_controls = obj
        .and_then(|o| case_insensitive_get(o, "sessionControls"))
        .map(build_session_controls);

    for w in norm_warnings {
        warnings.push(LoadWarning {
            source_ref: source_ref.to_string(),
            message: format!("unrecognized token '{}' in field '{}'", w.token, w.field),
        });
    }

    NormalizedPolicy {
        id,
        display_name,
        state,
        source_format,
        source_ref: source_ref.to_string(),
        conditions,
        grant_controls,
        session_controls,
        raw: value.clone(),
    }
}

fn case_insensitive_get<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    obj.get(key).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn str_seq(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn build_include_exclude(value: &Value, canon: impl Fn(&str) -> String) -> IncludeExclude {
    let obj = value.as_object();
    let include = str_seq(obj.and_then(|o| case_insensitive_get(o, "include")));
    let exclude = str_seq(obj.and_then(|o| case_insensitive_get(o, "exclude")));
    IncludeExclude {
        include: canonicalize_sequence(include, &canon),
        exclude: canonicalize_sequence(exclude, &canon),
    }
}

fn build_conditions(value: &Value, warnings: &mut Vec<NormalizeWarning>) -> Conditions {
    let obj = value.as_object();

    let applications = obj
        .and_then(|o| case_insensitive_get(o, "applications"))
        .map(|v| {
            let ao = v.as_object();
            Applications {
                include: str_seq(ao.and_then(|o| case_insensitive_get(o, "include"))),
                exclude: str_seq(ao.and_then(|o| case_insensitive_get(o, "exclude"))),
                include_user_actions: str_seq(
                    ao.and_then(|o| case_insensitive_get(o, "includeUserActions")),
                ),
            }
        });

    let users = obj
        .and_then(|o| case_insensitive_get(o, "users"))
        .map(|v| {
            let uo = v.as_object();
            Users {
                include_users: str_seq(uo.and_then(|o| case_insensitive_get(o, "includeUsers"))),
                exclude_users: str_seq(uo.and_then(|o| case_insensitive_get(o, "excludeUsers"))),
                include_groups: str_seq(
                    uo.and_then(|o| case_insensitive_get(o, "includeGroups")),
                ),
                exclude_groups: str_seq(
                    uo.and_then(|o| case_insensitive_get(o, "excludeGroups")),
                ),
                include_roles: str_seq(uo.and_then(|o| case_insensitive_get(o, "includeRoles"))),
                exclude_roles: str_seq(uo.and_then(|o| case_insensitive_get(o, "excludeRoles"))),
            }
        });

    let client_app_types = canonicalize_sequence(
        str_seq(obj.and_then(|o| case_insensitive_get(o, "clientAppTypes"))),
        |t| normalize_client_app_type(t, warnings),
    );

    let platforms = obj
        .and_then(|o| case_insensitive_get(o, "platforms"))
        .map(|v| build_include_exclude(v, normalize_lowercase_token));
    let locations = obj
        .and_then(|o| case_insensitive_get(o, "locations"))
        .map(|v| build_include_exclude(v, normalize_lowercase_token));

    let sign_in_risk_levels = canonicalize_sequence(
        str_seq(obj.and_then(|o| case_insensitive_get(o, "signInRiskLevels"))),
        normalize_lowercase_token,
    );
    let user_risk_levels = canonicalize_sequence(
        str_seq(obj.and_then(|o| case_insensitive_get(o, "userRiskLevels"))),
        normalize_lowercase_token,
    );

    Conditions {
        applications,
        users,
        client_app_types,
        platforms,
        locations,
        sign_in_risk_levels,
        user_risk_levels,
    }
}

fn build_grant_controls(value: &Value, warnings: &mut Vec<NormalizeWarning>) -> GrantControls {
    let obj = value.as_object();
    let operator = obj
        .and_then(|o| case_insensitive_get(o, "operator"))
        .and_then(|v| v.as_str())
        .map(|s| {
            if s.eq_ignore_ascii_case("and") {
                GrantOperator::And
            } else {
                GrantOperator::Or
            }
        })
        .unwrap_or(GrantOperator::Or);

    let built_in_controls = canonicalize_sequence(
        str_seq(obj.and_then(|o| case_insensitive_get(o, "builtInControls"))),
        |t| normalize_built_in_control(t, warnings),
    );
    let custom_auth_factors = canonicalize_sequence(
        str_seq(obj.and_then(|o| case_insensitive_get(o, "customAuthenticationFactors"))),
        normalize_lowercase_token,
    );
    let terms_of_use = canonicalize_sequence(
        str_seq(obj.and_then(|o| case_insensitive_get(o, "termsOfUse"))),
        |s| s.to_string(),
    );
    let authentication_strength = obj
        .and_then(|o| case_insensitive_get(o, "authenticationStrength"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    GrantControls {
        operator,
        built_in_controls,
        custom_auth_factors,
        terms_of_use,
        authentication_strength,
    }
}

fn build_session_controls(value: &Value) -> SessionControls {
    let obj = value.as_object();

    let application_enforced_restrictions = obj
        .and_then(|o| case_insensitive_get(o, "applicationEnforcedRestrictions"))
        .map(|v| ApplicationEnforcedRestrictions {
            enabled: v
                .as_object()
                .and_then(|o| case_insensitive_get(o, "isEnabled"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
        });

    let cloud_app_security = obj
        .and_then(|o| case_insensitive_get(o, "cloudAppSecurity"))
        .map(|v| {
            let co = v.as_object();
            CloudAppSecurity {
                enabled: co
                    .and_then(|o| case_insensitive_get(o, "isEnabled"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                cloud_app_security_type: co
                    .and_then(|o| case_insensitive_get(o, "cloudAppSecurityType"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        });

    let persistent_browser = obj
        .and_then(|o| case_insensitive_get(o, "persistentBrowser"))
        .map(|v| {
            let po = v.as_object();
            PersistentBrowser {
                enabled: po
                    .and_then(|o| case_insensitive_get(o, "isEnabled"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                mode: po
                    .and_then(|o| case_insensitive_get(o, "mode"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        });

    let sign_in_frequency = obj
        .and_then(|o| case_insensitive_get(o, "signInFrequency"))
        .map(|v| {
            let so = v.as_object();
            SignInFrequency {
                enabled: so
                    .and_then(|o| case_insensitive_get(o, "isEnabled"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                value: so
                    .and_then(|o| case_insensitive_get(o, "value"))
                    .and_then(Value::as_u64)
                    .map(|n| n as u32),
                frequency_type: so
                    .and_then(|o| case_insensitive_get(o, "type"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                frequency_interval: so
                    .and_then(|o| case_insensitive_get(o, "frequencyInterval"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        });

    SessionControls {
        application_enforced_restrictions,
        cloud_app_security,
        persistent_browser,
        sign_in_frequency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assemble_policy_canonicalizes_state_and_is_case_insensitive() {
        let value = json!({"ID": "p1", "DisplayName": "Baseline MFA", "State": "Enabled"});
        let mut warnings = Vec::new();
        let policy = assemble_policy(&value, SourceFormat::Json, "p1.json", &mut warnings);
        assert_eq!(policy.id, "p1");
        assert_eq!(policy.display_name, "Baseline MFA");
        assert_eq!(policy.state, PolicyState::Enabled);
        assert!(warnings.is_empty());
    }

    #[test]
    fn assemble_policy_canonicalizes_built_in_controls() {
        let value = json!({
            "displayName": "Require MFA",
            "state": "enabled",
            "grantControls": {"operator": "OR", "builtInControls": ["1", "mfa"]}
        });
        let mut warnings = Vec::new();
        let policy = assemble_policy(&value, SourceFormat::Json, "p2.json", &mut warnings);
        let gc = policy.grant_controls.unwrap();
        assert_eq!(gc.built_in_controls, vec!["mfa"]);
    }
}
