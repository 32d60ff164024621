use std::sync::Arc;

use ahash::HashMap;
use depth_gate_config::{
    apis::ApiConfig,
    sessions::{AccessRightsConfig, SessionConfig},
    DepthGateConfig,
};
use tracing::{debug, info, warn};

use crate::error::{InvalidDepthLimit, RegistryError};
use crate::policy::{AccessGrant, DepthLimit, FieldLimitRule};
use crate::schema::Schema;
use crate::session::{ApiDefinition, SessionState};

/// API definitions and sessions built from the configuration. Both are shared
/// read-only across requests.
#[derive(Debug, Default)]
pub struct Registry {
    apis: HashMap<String, Arc<ApiDefinition>>,
    sessions: HashMap<String, Arc<SessionState>>,
}

impl Registry {
    pub fn from_config(config: &DepthGateConfig) -> Result<Self, RegistryError> {
        let mut registry = Registry::default();

        for (api_id, api_config) in &config.apis {
            let api = api_definition(api_id, api_config)?;
            debug!(
                "registered API '{}' (graphql: {})",
                api_id,
                api.graphql_enabled()
            );
            registry.apis.insert(api_id.clone(), Arc::new(api));
        }

        for (key, session_config) in &config.sessions {
            let session = session_state(key, session_config).map_err(|source| {
                RegistryError::InvalidSessionLimits {
                    session: key.clone(),
                    source,
                }
            })?;
            for api_id in session.access_rights.keys() {
                if !registry.apis.contains_key(api_id) {
                    warn!(
                        "session '{}' has access rights for unknown API '{}'",
                        key, api_id
                    );
                }
            }
            registry.sessions.insert(key.clone(), Arc::new(session));
        }

        info!(
            "loaded {} API(s) and {} session(s)",
            registry.apis.len(),
            registry.sessions.len()
        );

        Ok(registry)
    }

    pub fn api(&self, api_id: &str) -> Option<Arc<ApiDefinition>> {
        self.apis.get(api_id).cloned()
    }

    pub fn session(&self, key: &str) -> Option<Arc<SessionState>> {
        self.sessions.get(key).cloned()
    }
}

fn api_definition(api_id: &str, config: &ApiConfig) -> Result<ApiDefinition, RegistryError> {
    if !config.graphql.enabled {
        return Ok(ApiDefinition::non_graphql(api_id));
    }

    let schema_path = config
        .graphql
        .schema
        .as_ref()
        .ok_or_else(|| RegistryError::MissingSchema {
            api_id: api_id.to_string(),
        })?;

    let sdl = schema_path
        .read_to_string()
        .map_err(|source| RegistryError::SchemaRead {
            api_id: api_id.to_string(),
            source,
        })?;

    let schema = Schema::parse(&sdl).map_err(|source| RegistryError::Schema {
        api_id: api_id.to_string(),
        source,
    })?;

    Ok(ApiDefinition::graphql(api_id, Arc::new(schema)))
}

fn session_state(key: &str, config: &SessionConfig) -> Result<SessionState, InvalidDepthLimit> {
    let mut session = SessionState::new(key);

    if let Some(max_query_depth) = config.max_query_depth {
        session = session.with_max_query_depth(DepthLimit::try_from(max_query_depth)?);
    }

    for (api_id, rights) in &config.access_rights {
        session = session.with_access_right(api_id.as_str(), access_grant(rights)?);
    }

    Ok(session)
}

fn access_grant(config: &AccessRightsConfig) -> Result<AccessGrant, InvalidDepthLimit> {
    let mut grant = AccessGrant::default();

    if let Some(limit) = &config.limit {
        grant = grant.with_global_depth_limit(DepthLimit::try_from(limit.max_query_depth)?);
    }

    for rule in &config.field_access_rights {
        grant = grant.with_field_limit(FieldLimitRule::new(
            rule.type_name.as_str(),
            rule.field_name.as_str(),
            DepthLimit::try_from(rule.limits.max_query_depth)?,
        ));
    }

    Ok(grant)
}
