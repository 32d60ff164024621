use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::primitives::file_path::FilePath;

/// Configuration of a single proxied API.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// GraphQL handling of the API. When disabled, operations sent to the API are
    /// never depth limited.
    #[serde(default)]
    pub graphql: GraphQLApiConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GraphQLApiConfig {
    /// Whether the API proxies GraphQL traffic.
    #[serde(default)]
    pub enabled: bool,

    /// Path to the SDL of the API's schema, relative to the configuration file.
    /// Required when `enabled` is `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<FilePath>,
}
