use std::sync::Arc;

use ahash::HashMap;

use crate::policy::{AccessGrant, DepthLimit};
use crate::schema::Schema;

/// A snapshot of a tenant session, read-only during admission.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub key: String,
    /// Session-wide fallback ceiling for document depth.
    pub max_query_depth: Option<DepthLimit>,
    pub access_rights: HashMap<String, AccessGrant>,
}

impl SessionState {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_max_query_depth(mut self, limit: DepthLimit) -> Self {
        self.max_query_depth = Some(limit);
        self
    }

    pub fn with_access_right(mut self, api_id: impl Into<String>, grant: AccessGrant) -> Self {
        self.access_rights.insert(api_id.into(), grant);
        self
    }

    pub fn access_grant(&self, api_id: &str) -> Option<&AccessGrant> {
        self.access_rights.get(api_id)
    }
}

/// A proxied API. Only APIs carrying a GraphQL schema are depth limited.
#[derive(Debug, Clone)]
pub struct ApiDefinition {
    pub api_id: String,
    graphql_schema: Option<Arc<Schema>>,
}

impl ApiDefinition {
    pub fn graphql(api_id: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            api_id: api_id.into(),
            graphql_schema: Some(schema),
        }
    }

    pub fn non_graphql(api_id: impl Into<String>) -> Self {
        Self {
            api_id: api_id.into(),
            graphql_schema: None,
        }
    }

    pub fn graphql_enabled(&self) -> bool {
        self.graphql_schema.is_some()
    }

    pub fn graphql_schema(&self) -> Option<&Schema> {
        self.graphql_schema.as_deref()
    }
}
