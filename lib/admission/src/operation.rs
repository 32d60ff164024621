use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, SelectionSet,
};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::schema::OperationKind;

/// The GraphQL part of an inbound request, as received from the client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn parse(&self) -> Result<OperationDocument, AnalysisError> {
        OperationDocument::parse(&self.query, self.operation_name.as_deref())
    }
}

/// A parsed executable document together with the name of the operation the
/// client asked to run.
#[derive(Debug)]
pub struct OperationDocument {
    document: Document<'static, String>,
    operation_name: Option<String>,
}

/// The operation of a document that admission applies to.
pub(crate) struct ActiveOperation<'a> {
    pub kind: OperationKind,
    pub selection_set: &'a SelectionSet<'static, String>,
}

impl OperationDocument {
    pub fn parse(query: &str, operation_name: Option<&str>) -> Result<Self, AnalysisError> {
        let document = graphql_parser::parse_query::<String>(query)?.into_static();

        Ok(Self::new(document, operation_name))
    }

    pub fn new(document: Document<'static, String>, operation_name: Option<&str>) -> Self {
        // clients commonly send an empty string instead of omitting the name
        let operation_name = operation_name
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Self {
            document,
            operation_name,
        }
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    pub(crate) fn active_operation(&self) -> Result<ActiveOperation<'_>, AnalysisError> {
        let mut operations = self
            .document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Operation(operation) => Some(operation),
                Definition::Fragment(_) => None,
            });

        let operation = match &self.operation_name {
            Some(name) => operations
                .find(|operation| name_of(operation) == Some(name.as_str()))
                .ok_or_else(|| AnalysisError::SpecifiedOperationNotFound {
                    operation_name: name.clone(),
                })?,
            None => {
                let first = operations.next().ok_or(AnalysisError::OperationNotFound)?;
                if operations.next().is_some() {
                    return Err(AnalysisError::MultipleMatchingOperationsFound);
                }
                first
            }
        };

        let (kind, selection_set) = match operation {
            OperationDefinition::SelectionSet(selection_set) => {
                (OperationKind::Query, selection_set)
            }
            OperationDefinition::Query(query) => (OperationKind::Query, &query.selection_set),
            OperationDefinition::Mutation(mutation) => {
                (OperationKind::Mutation, &mutation.selection_set)
            }
            OperationDefinition::Subscription(subscription) => {
                (OperationKind::Subscription, &subscription.selection_set)
            }
        };

        Ok(ActiveOperation {
            kind,
            selection_set,
        })
    }

    pub(crate) fn fragment(&self, name: &str) -> Option<&FragmentDefinition<'static, String>> {
        self.document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                Definition::Fragment(fragment) if fragment.name == name => Some(fragment),
                _ => None,
            })
    }
}

fn name_of<'a>(operation: &'a OperationDefinition<'static, String>) -> Option<&'a str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}
