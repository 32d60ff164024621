/// Failures while locating the active operation or walking its selections
/// against the schema.
///
/// Documents reaching the admission core are expected to be parsed and validated
/// already, so every variant signals a contract violation upstream. They all
/// classify as `AdmissionOutcome::MalformedOperation`.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to parse GraphQL operation: {0}")]
    ParseError(#[from] graphql_parser::query::ParseError),

    #[error("Multiple operations found, but no operation name was specified.")]
    MultipleMatchingOperationsFound,

    #[error("Specified operation '{operation_name}' not found.")]
    SpecifiedOperationNotFound { operation_name: String },

    #[error("An operation was expected, but none were present.")]
    OperationNotFound,

    #[error("Schema does not define a root type for {operation_kind} operations.")]
    RootTypeNotFound { operation_kind: &'static str },

    #[error("Schema type '{type_name}' not found.")]
    SchemaTypeNotFound { type_name: String },

    #[error("Field '{field_name}' not found in type '{type_name}'.")]
    FieldNotFoundInType {
        field_name: String,
        type_name: String,
    },

    #[error("Fragment definition for '{fragment_name}' not found.")]
    FragmentDefinitionNotFound { fragment_name: String },

    #[error("Fragment '{fragment_name}' spreads itself.")]
    FragmentCycle { fragment_name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    ParseError(#[from] graphql_parser::schema::ParseError),

    #[error("Query root type '{type_name}' is not defined in the schema.")]
    MissingQueryType { type_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid depth limit, expected -1 (unlimited) or a non-negative number")]
pub struct InvalidDepthLimit(pub i64);

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to read the schema of API '{api_id}': {source}")]
    SchemaRead {
        api_id: String,
        source: std::io::Error,
    },

    #[error("Invalid schema for API '{api_id}': {source}")]
    Schema { api_id: String, source: SchemaError },

    #[error("API '{api_id}' has GraphQL enabled but no schema configured")]
    MissingSchema { api_id: String },

    #[error("Invalid depth limits in session '{session}': {source}")]
    InvalidSessionLimits {
        session: String,
        source: InvalidDepthLimit,
    },
}
