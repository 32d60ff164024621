//! Type index over an API's SDL.
//!
//! The depth analyzer only needs to follow a field to the named type it
//! returns, so the index keeps exactly that: for every object and interface
//! type, a map from field name to the unwrapped output type name.

use std::collections::hash_map::Entry;

use ahash::HashMap;
use graphql_parser::schema::{Definition, Document, Field, Type, TypeDefinition, TypeExtension};

use crate::error::{AnalysisError, SchemaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

#[derive(Debug)]
enum SchemaType {
    /// Object or interface type: field name -> named output type.
    Composite(HashMap<String, String>),
    /// Scalars, enums, unions and input objects have no selectable fields.
    Other,
}

#[derive(Debug)]
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    types: HashMap<String, SchemaType>,
}

impl Schema {
    pub fn parse(sdl: &str) -> Result<Self, SchemaError> {
        let document = graphql_parser::parse_schema::<String>(sdl)?;
        Self::from_document(&document)
    }

    pub fn from_document(document: &Document<'_, String>) -> Result<Self, SchemaError> {
        let mut types: HashMap<String, SchemaType> = HashMap::default();
        let mut root_types = (None, None, None);

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema_def) => {
                    root_types = (
                        schema_def.query.clone(),
                        schema_def.mutation.clone(),
                        schema_def.subscription.clone(),
                    );
                }
                Definition::TypeDefinition(type_def) => {
                    let (name, schema_type) = match type_def {
                        TypeDefinition::Object(object) => {
                            (&object.name, composite(&object.fields))
                        }
                        TypeDefinition::Interface(interface) => {
                            (&interface.name, composite(&interface.fields))
                        }
                        TypeDefinition::Scalar(scalar) => (&scalar.name, SchemaType::Other),
                        TypeDefinition::Union(union) => (&union.name, SchemaType::Other),
                        TypeDefinition::Enum(enum_type) => (&enum_type.name, SchemaType::Other),
                        TypeDefinition::InputObject(input) => (&input.name, SchemaType::Other),
                    };
                    merge_type(&mut types, name, schema_type);
                }
                Definition::TypeExtension(TypeExtension::Object(extension)) => {
                    merge_type(&mut types, &extension.name, composite(&extension.fields));
                }
                Definition::TypeExtension(TypeExtension::Interface(extension)) => {
                    merge_type(&mut types, &extension.name, composite(&extension.fields));
                }
                Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => {}
            }
        }

        let (query, mutation, subscription) = root_types;
        let query_type = query.unwrap_or_else(|| "Query".to_string());
        if !types.contains_key(&query_type) {
            return Err(SchemaError::MissingQueryType {
                type_name: query_type,
            });
        }

        let mutation_type = mutation.or_else(|| default_root(&types, "Mutation"));
        let subscription_type = subscription.or_else(|| default_root(&types, "Subscription"));

        Ok(Schema {
            query_type,
            mutation_type,
            subscription_type,
            types,
        })
    }

    pub fn root_type(&self, kind: OperationKind) -> Result<&str, AnalysisError> {
        let root = match kind {
            OperationKind::Query => Some(self.query_type.as_str()),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        };

        root.ok_or(AnalysisError::RootTypeNotFound {
            operation_kind: kind.as_str(),
        })
    }

    /// Returns the schema's own copy of `type_name`, failing when it is unknown.
    pub fn type_name(&self, type_name: &str) -> Result<&str, AnalysisError> {
        self.types
            .get_key_value(type_name)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| AnalysisError::SchemaTypeNotFound {
                type_name: type_name.to_string(),
            })
    }

    /// Resolves the named output type of `type_name.field_name`.
    pub fn field_type(&self, type_name: &str, field_name: &str) -> Result<&str, AnalysisError> {
        match self.types.get(type_name) {
            Some(SchemaType::Composite(fields)) => fields
                .get(field_name)
                .map(String::as_str)
                .ok_or_else(|| AnalysisError::FieldNotFoundInType {
                    field_name: field_name.to_string(),
                    type_name: type_name.to_string(),
                }),
            Some(SchemaType::Other) => Err(AnalysisError::FieldNotFoundInType {
                field_name: field_name.to_string(),
                type_name: type_name.to_string(),
            }),
            None => Err(AnalysisError::SchemaTypeNotFound {
                type_name: type_name.to_string(),
            }),
        }
    }
}

fn composite(fields: &[Field<'_, String>]) -> SchemaType {
    SchemaType::Composite(
        fields
            .iter()
            .map(|field| (field.name.clone(), named_type(&field.field_type).to_string()))
            .collect(),
    )
}

fn merge_type(types: &mut HashMap<String, SchemaType>, name: &str, schema_type: SchemaType) {
    match types.entry(name.to_string()) {
        Entry::Occupied(mut entry) => {
            if let (SchemaType::Composite(existing), SchemaType::Composite(fields)) =
                (entry.get_mut(), schema_type)
            {
                existing.extend(fields);
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(schema_type);
        }
    }
}

fn default_root(types: &HashMap<String, SchemaType>, name: &str) -> Option<String> {
    types.contains_key(name).then(|| name.to_string())
}

fn named_type<'a>(field_type: &'a Type<'_, String>) -> &'a str {
    match field_type {
        Type::NamedType(name) => name.as_str(),
        Type::ListType(inner) | Type::NonNullType(inner) => named_type(inner),
    }
}
