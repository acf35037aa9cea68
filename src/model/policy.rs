//! The dialect-agnostic policy model.
//!
//! A [`NormalizedPolicy`] is built once by a loader and never mutated
//! afterward; every set-typed field is stored in canonical (sorted,
//! deduplicated) form so two policies can be compared field-by-field
//! without re-deriving canonical order at diff time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which on-disk dialect a policy was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
    Hcl,
}

/// Canonical policy enablement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyState {
    Enabled,
    Disabled,
    ReportOnly,
}

/// Include/exclude pair of token sequences, already canonicalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeExclude {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// `conditions.applications`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applications {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_user_actions: Vec<String>,
}

/// `conditions.users`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Users {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_roles: Vec<String>,
}

/// Conditions under which a policy applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Applications>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Users>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_app_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<IncludeExclude>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<IncludeExclude>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sign_in_risk_levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_risk_levels: Vec<String>,
}

/// `AND` / `OR` combination of grant controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantOperator {
    And,
    Or,
}

/// Required controls for granting access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantControls {
    pub operator: GrantOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub built_in_controls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_auth_factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms_of_use: Vec<String>,
    /// Opaque reference; resolving the strength definition is out of scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_strength: Option<String>,
}

/// `sessionControls.applicationEnforcedRestrictions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEnforcedRestrictions {
    pub enabled: bool,
}

/// `sessionControls.cloudAppSecurity`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAppSecurity {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_app_security_type: Option<String>,
}

/// `sessionControls.persistentBrowser`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentBrowser {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// `sessionControls.signInFrequency`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInFrequency {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_interval: Option<String>,
}

/// Session-level enforcement controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionControls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_enforced_restrictions: Option<ApplicationEnforcedRestrictions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_app_security: Option<CloudAppSecurity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_browser: Option<PersistentBrowser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_frequency: Option<SignInFrequency>,
}

/// A single dialect-agnostic policy, already in canonical form.
///
/// Two `NormalizedPolicy` values compare equal (`==`) iff they are
/// semantically identical under the normalizer, regardless of which
/// dialect produced them or what order their set-typed fields were
/// written in on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPolicy {
    #[serde(default)]
    pub id: String,
    pub display_name: String,
    pub state: PolicyState,
    #[serde(skip)]
    pub source_format: SourceFormat,
    #[serde(skip)]
    pub source_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_controls: Option<GrantControls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_controls: Option<SessionControls>,
    /// The original document, retained verbatim for report rendering.
    #[serde(skip)]
    pub raw: Value,
}

impl PartialEq for NormalizedPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.state == other.state
            && self.conditions == other.conditions
            && self.grant_controls == other.grant_controls
            && self.session_controls == other.session_controls
    }
}

impl Eq for NormalizedPolicy {}

impl Default for SourceFormat {
    fn default() -> Self {
        SourceFormat::Json
    }
}
