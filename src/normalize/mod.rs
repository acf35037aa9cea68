//! The Value Normalizer (C1): canonicalizes enum-like scalars and
//! set-semantic sequences so two dialect-distinct documents compare equal
//! when they are semantically the same policy.
//!
//! Never fails. Anomalies (unknown tokens) are accumulated as
//! [`NormalizeWarning`]s for the caller to surface.

use std::collections::BTreeSet;

/// A non-fatal anomaly observed while canonicalizing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeWarning {
    pub field: String,
    pub token: String,
}

fn built_in_control_alias(token: &str) -> Option<&'static str> {
    match token {
        "1" | "mfa" => Some("mfa"),
        "2" | "compliantDevice" => Some("compliantDevice"),
        "3" | "domainJoinedDevice" => Some("domainJoinedDevice"),
        "4" | "approvedApplication" => Some("approvedApplication"),
        "5" | "compliantApplication" => Some("compliantApplication"),
        "6" | "passwordChange" => Some("passwordChange"),
        "7" | "block" => Some("block"),
        _ => None,
    }
}

fn client_app_type_alias(token: &str) -> Option<&'static str> {
    match token {
        "0" | "browser" => Some("browser"),
        "1" | "mobileAppsAndDesktopClients" => Some("mobileAppsAndDesktopClients"),
        "2" | "exchangeActiveSync" => Some("exchangeActiveSync"),
        "3" | "other" => Some("other"),
        _ => None,
    }
}

/// Canonicalize a single `builtInControls` token, recording a warning for
/// anything unrecognized (the token still passes through verbatim).
pub fn normalize_built_in_control(token: &str, warnings: &mut Vec<NormalizeWarning>) -> String {
    match built_in_control_alias(token) {
        Some(canonical) => canonical.to_string(),
        None => {
            warnings.push(NormalizeWarning {
                field: "grantControls.builtInControls".to_string(),
                token: token.to_string(),
            });
            token.to_string()
        }
    }
}

/// Canonicalize a single `clientAppTypes` token.
pub fn normalize_client_app_type(token: &str, warnings: &mut Vec<NormalizeWarning>) -> String {
    match client_app_type_alias(token) {
        Some(canonical) => canonical.to_string(),
        None => {
            warnings.push(NormalizeWarning {
                field: "conditions.clientAppTypes".to_string(),
                token: token.to_string(),
            });
            token.to_string()
        }
    }
}

/// Canonicalize the policy `state` field. Case-insensitive; the report-only
/// alias collapses to the single canonical `reportOnly` form.
pub fn normalize_state(token: &str, warnings: &mut Vec<NormalizeWarning>) -> String {
    match token.to_ascii_lowercase().as_str() {
        "enabled" => "enabled".to_string(),
        "disabled" => "disabled".to_string(),
        "enabledforreportingbutnotenforced" | "reportonly" => "reportOnly".to_string(),
        _ => {
            warnings.push(NormalizeWarning {
                field: "state".to_string(),
                token: token.to_string(),
            });
            token.to_ascii_lowercase()
        }
    }
}

/// Lowercase a risk-level / platform / location token. No aliasing.
pub fn normalize_lowercase_token(token: &str) -> String {
    token.to_ascii_lowercase()
}

/// Sort and dedup a set-semantic sequence, mapping absent/empty to an
/// empty `Vec` (the canonical absent representation).
pub fn canonicalize_sequence<I, F>(items: I, mut canon: F) -> Vec<String>
where
    I: IntoIterator<Item = String>,
    F: FnMut(&str) -> String,
{
    let set: BTreeSet<String> = items.into_iter().map(|s| canon(&s)).collect();
    set.into_iter().collect()
}
