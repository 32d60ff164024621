use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A tenant session and the APIs it may call.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Session-wide depth ceiling, used when an access right has no global `limit`
    /// and some root field of the operation has no field rule.
    ///
    /// `-1` and `0` mean "no ceiling".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_query_depth: Option<i64>,

    /// Access rights keyed by API id. A session without an entry for an API is
    /// rejected for that API.
    #[serde(default)]
    pub access_rights: HashMap<String, AccessRightsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AccessRightsConfig {
    /// Limits applied to the whole API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<ApiLimitConfig>,

    /// Per root field overrides. The first rule matching a root field wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_access_rights: Vec<FieldAccessRuleConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiLimitConfig {
    /// Document-wide depth ceiling. `0` disables it, `-1` means unlimited.
    #[serde(default)]
    pub max_query_depth: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldAccessRuleConfig {
    /// Root type the field belongs to, e.g. `Query` or `Mutation`.
    pub type_name: String,
    pub field_name: String,
    #[serde(default)]
    pub limits: FieldLimitsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldLimitsConfig {
    /// Depth ceiling of the field's subtree. `-1` means unlimited, `0` allows only a
    /// leaf selection.
    #[serde(default)]
    pub max_query_depth: i64,
}
