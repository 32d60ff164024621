pub mod apis;
mod env_overrides;
pub mod log;
pub mod primitives;
pub mod sessions;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{
    apis::ApiConfig,
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    log::LoggingConfig,
    primitives::file_path::with_start_path,
    sessions::SessionConfig,
};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DepthGateConfig {
    /// The logger configuration.
    #[serde(default)]
    pub log: LoggingConfig,

    /// The proxied APIs, keyed by API id.
    #[serde(default)]
    pub apis: HashMap<String, ApiConfig>,

    /// Tenant sessions, keyed by session key.
    #[serde(default)]
    pub sessions: HashMap<String, SessionConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum GateConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to get the current directory: {0}")]
    CurrentDirError(std::io::Error),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "depth-gate.config.yaml",
    "depth-gate.config.yml",
    "depth-gate.config.json",
    "depth-gate.config.json5",
];

fn get_current_dir() -> Result<PathBuf, GateConfigError> {
    std::env::current_dir().map_err(GateConfigError::CurrentDirError)
}

pub fn load_config(
    override_config_path: Option<String>,
) -> Result<DepthGateConfig, GateConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();
    let mut config_root_path = get_current_dir()?;

    if let Some(path_str) = override_config_path {
        let path_buf = PathBuf::from(path_str);
        if let Some(parent_dir) = path_buf.parent() {
            config_root_path = config_root_path.join(parent_dir);
        }
        let as_file: File<FileSourceFile, _> = path_buf.into();
        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    // relative paths in the file resolve against the file's directory
    let base_cfg = with_start_path(&config_root_path, || {
        config.build()?.try_deserialize::<DepthGateConfig>()
    })?;

    Ok(base_cfg)
}

/// Parses inline YAML. Relative paths resolve against the current directory.
pub fn parse_yaml_config(config_raw: &str) -> Result<DepthGateConfig, GateConfigError> {
    let config_root_path = get_current_dir()?;
    let config = Config::builder();

    let base_cfg = with_start_path(&config_root_path, || {
        config
            .add_source(File::from_str(config_raw, FileFormat::Yaml))
            .build()?
            .try_deserialize::<DepthGateConfig>()
    })?;

    Ok(base_cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sessions_and_access_rights() {
        let config = parse_yaml_config(
            r#"
sessions:
  tenant-a:
    max_query_depth: 3
    access_rights:
      countries:
        limit:
          max_query_depth: 1
        field_access_rights:
          - type_name: Query
            field_name: countries
            limits:
              max_query_depth: -1
          - type_name: Mutation
            field_name: putCountry
"#,
        )
        .expect("config should parse");

        let session = &config.sessions["tenant-a"];
        assert_eq!(session.max_query_depth, Some(3));

        let rights = &session.access_rights["countries"];
        assert_eq!(rights.limit.as_ref().map(|l| l.max_query_depth), Some(1));
        assert_eq!(rights.field_access_rights.len(), 2);
        assert_eq!(rights.field_access_rights[0].limits.max_query_depth, -1);
        // a rule without limits is an enforced zero ceiling
        assert_eq!(rights.field_access_rights[1].limits.max_query_depth, 0);
    }

    #[test]
    fn graphql_is_disabled_by_default() {
        let config = parse_yaml_config(
            r#"
apis:
  rest-api: {}
"#,
        )
        .expect("config should parse");

        let api = &config.apis["rest-api"];
        assert!(!api.graphql.enabled);
        assert!(api.graphql.schema.is_none());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = parse_yaml_config(
            r#"
sessions:
  tenant-a:
    max_depth: 3
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn schema_path_must_exist() {
        let result = parse_yaml_config(
            r#"
apis:
  countries:
    graphql:
      enabled: true
      schema: ./does-not-exist.graphql
"#,
        );
        let err = result.expect_err("missing schema file should be reported");
        assert!(err.to_string().contains("does-not-exist.graphql"));
    }

    #[test]
    fn resolves_paths_against_the_config_file_directory() {
        let root = tempfile::tempdir().expect("temp dir should be created");
        let config_dir = root.path().join("gateway");
        std::fs::create_dir(&config_dir).expect("config dir should be created");
        std::fs::write(config_dir.join("countries.graphql"), "type Query { a: Int }")
            .expect("schema should be written");

        let config_path = config_dir.join("depth-gate.config.yaml");
        std::fs::write(
            &config_path,
            r#"
apis:
  countries:
    graphql:
      enabled: true
      schema: ./countries.graphql
"#,
        )
        .expect("config should be written");

        let config = load_config(Some(config_path.to_string_lossy().to_string()))
            .expect("config should load");
        let schema = config.apis["countries"]
            .graphql
            .schema
            .as_ref()
            .expect("schema path should be set");

        let expected = std::fs::canonicalize(config_dir.join("countries.graphql"))
            .expect("schema should exist");
        assert_eq!(schema.relative, "./countries.graphql");
        assert_eq!(schema.absolute, expected.to_string_lossy());
        assert_eq!(
            schema.read_to_string().expect("schema should be readable"),
            "type Query { a: Int }"
        );
    }
}
