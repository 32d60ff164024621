//! Structural depth of a GraphQL operation.
//!
//! Depth counts nested selection levels. Inside a root field, the field's own
//! selections sit at depth 1, theirs at depth 2 and so on, so a root field
//! without selections has depth 0. The document depth adds one level for the
//! root selection set itself.
//!
//! Fragment spreads and inline fragments are transparent: their selections
//! are measured as if they were written in place of the spread.

use std::cmp;

use ahash::{HashMap, HashSet};
use graphql_parser::query::{Field, FragmentDefinition, Selection, SelectionSet, TypeCondition};
use serde::Serialize;

use crate::error::AnalysisError;
use crate::operation::OperationDocument;
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootFieldDepth {
    /// Root type the field was selected on.
    pub type_name: String,
    pub field_name: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationDepths {
    /// One entry per distinct root field, in selection order. A field selected
    /// more than once (through aliases or fragments) reports its deepest
    /// occurrence.
    pub fields: Vec<RootFieldDepth>,
    pub document_depth: usize,
}

impl OperationDepths {
    pub fn field_depth(&self, type_name: &str, field_name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|field| field.type_name == type_name && field.field_name == field_name)
            .map(|field| field.depth)
    }

    fn record(&mut self, type_name: &str, field_name: &str, depth: usize) {
        match self
            .fields
            .iter_mut()
            .find(|field| field.type_name == type_name && field.field_name == field_name)
        {
            Some(existing) => existing.depth = cmp::max(existing.depth, depth),
            None => self.fields.push(RootFieldDepth {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
                depth,
            }),
        }
    }
}

pub fn compute_depths(
    operation: &OperationDocument,
    schema: &Schema,
) -> Result<OperationDepths, AnalysisError> {
    let active = operation.active_operation()?;
    let root_type = schema.root_type(active.kind)?;

    let mut visitor = DepthVisitor {
        document: operation,
        schema,
        fragment_depths: HashMap::default(),
        fragments_in_progress: HashSet::default(),
    };

    let mut depths = OperationDepths::default();
    visitor.collect_root_fields(active.selection_set, root_type, &mut depths)?;

    depths.document_depth = depths
        .fields
        .iter()
        .map(|field| field.depth + 1)
        .max()
        .unwrap_or(0);

    Ok(depths)
}

type ParentType<'a> = Option<&'a str>;

struct DepthVisitor<'a> {
    document: &'a OperationDocument,
    schema: &'a Schema,
    fragment_depths: HashMap<&'a str, usize>,
    fragments_in_progress: HashSet<&'a str>,
}

impl<'a> DepthVisitor<'a> {
    fn collect_root_fields(
        &mut self,
        selection_set: &'a SelectionSet<'static, String>,
        parent_type: &'a str,
        depths: &mut OperationDepths,
    ) -> Result<(), AnalysisError> {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    let depth = self.field_depth(field, Some(parent_type))?;
                    depths.record(parent_type, &field.name, depth);
                }
                Selection::InlineFragment(fragment) => {
                    let type_name = match &fragment.type_condition {
                        Some(TypeCondition::On(type_name)) => self.schema.type_name(type_name)?,
                        None => parent_type,
                    };
                    self.collect_root_fields(&fragment.selection_set, type_name, depths)?;
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let fragment = self.enter_fragment(name)?;
                    let TypeCondition::On(type_name) = &fragment.type_condition;
                    let type_name = self.schema.type_name(type_name)?;
                    self.collect_root_fields(&fragment.selection_set, type_name, depths)?;
                    self.fragments_in_progress.remove(name);
                }
            }
        }

        Ok(())
    }

    fn field_depth(
        &mut self,
        field: &'a Field<'static, String>,
        parent_type: ParentType<'a>,
    ) -> Result<usize, AnalysisError> {
        let field_type = self.resolve_field(parent_type, &field.name)?;

        self.selection_set_depth(&field.selection_set, field_type)
    }

    fn selection_set_depth(
        &mut self,
        selection_set: &'a SelectionSet<'static, String>,
        parent_type: ParentType<'a>,
    ) -> Result<usize, AnalysisError> {
        let mut depth = 0;

        for selection in &selection_set.items {
            let selection_depth = match selection {
                Selection::Field(field) => 1 + self.field_depth(field, parent_type)?,
                Selection::InlineFragment(fragment) => {
                    let type_name =
                        self.type_condition(fragment.type_condition.as_ref(), parent_type)?;
                    self.selection_set_depth(&fragment.selection_set, type_name)?
                }
                Selection::FragmentSpread(spread) => self.fragment_depth(&spread.fragment_name)?,
            };
            depth = cmp::max(depth, selection_depth);
        }

        Ok(depth)
    }

    fn fragment_depth(&mut self, name: &'a str) -> Result<usize, AnalysisError> {
        if let Some(depth) = self.fragment_depths.get(name) {
            return Ok(*depth);
        }

        let fragment = self.enter_fragment(name)?;
        let type_name = self.type_condition(Some(&fragment.type_condition), None)?;
        let depth = self.selection_set_depth(&fragment.selection_set, type_name)?;
        self.fragments_in_progress.remove(name);

        self.fragment_depths.insert(name, depth);
        Ok(depth)
    }

    fn enter_fragment(
        &mut self,
        name: &'a str,
    ) -> Result<&'a FragmentDefinition<'static, String>, AnalysisError> {
        let document: &'a OperationDocument = self.document;
        let fragment =
            document
                .fragment(name)
                .ok_or_else(|| AnalysisError::FragmentDefinitionNotFound {
                    fragment_name: name.to_string(),
                })?;

        if !self.fragments_in_progress.insert(name) {
            return Err(AnalysisError::FragmentCycle {
                fragment_name: name.to_string(),
            });
        }

        Ok(fragment)
    }

    /// Resolves the type a fragment's selections apply to. Introspection types
    /// are not part of the SDL, so their selections are walked without type
    /// information.
    fn type_condition(
        &self,
        condition: Option<&'a TypeCondition<'static, String>>,
        parent_type: ParentType<'a>,
    ) -> Result<ParentType<'a>, AnalysisError> {
        match condition {
            Some(TypeCondition::On(type_name)) if type_name.starts_with("__") => Ok(None),
            Some(TypeCondition::On(type_name)) => self.schema.type_name(type_name).map(Some),
            None => Ok(parent_type),
        }
    }

    fn resolve_field(
        &self,
        parent_type: ParentType<'a>,
        field_name: &str,
    ) -> Result<ParentType<'a>, AnalysisError> {
        match (parent_type, field_name) {
            (_, "__typename" | "__schema" | "__type") => Ok(None),
            (None, _) => Ok(None),
            (Some(type_name), field_name) => {
                self.schema.field_type(type_name, field_name).map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTRIES_SDL: &str = include_str!("../tests/fixtures/countries.graphql");

    fn depths_of(
        query: &str,
        operation_name: Option<&str>,
    ) -> Result<OperationDepths, AnalysisError> {
        let schema = Schema::parse(COUNTRIES_SDL).expect("schema should parse");
        let document =
            OperationDocument::parse(query, operation_name).expect("query should parse");
        compute_depths(&document, &schema)
    }

    #[test]
    fn counts_nested_selection_levels() {
        let depths = depths_of(
            "query TestQuery { countries { code name continent { code name countries { code name } } } }",
            Some("TestQuery"),
        )
        .expect("depths should be computed");

        assert_eq!(depths.field_depth("Query", "countries"), Some(3));
        assert_eq!(depths.document_depth, 4);
    }

    #[test]
    fn document_depth_follows_the_deepest_root_field() {
        let depths = depths_of(
            r#"query TestQuery {
                countries { continent { countries { name } } }
                continents { countries { continent { countries { name } } } }
            }"#,
            Some("TestQuery"),
        )
        .expect("depths should be computed");

        assert_eq!(
            depths.fields,
            vec![
                RootFieldDepth {
                    type_name: "Query".to_string(),
                    field_name: "countries".to_string(),
                    depth: 3,
                },
                RootFieldDepth {
                    type_name: "Query".to_string(),
                    field_name: "continents".to_string(),
                    depth: 4,
                },
            ]
        );
        assert_eq!(depths.document_depth, 5);
    }

    #[test]
    fn leaf_root_field_has_zero_depth() {
        let depths = depths_of("{ __typename }", None).expect("depths should be computed");

        assert_eq!(depths.field_depth("Query", "__typename"), Some(0));
        assert_eq!(depths.document_depth, 1);
    }

    #[test]
    fn fragments_do_not_change_measured_depth() {
        let inlined = depths_of(
            "{ countries { continent { countries { name } } } }",
            None,
        )
        .expect("depths should be computed");

        let with_fragments = depths_of(
            r#"
            query {
                ...Root
            }

            fragment Root on Query {
                countries { ...CountryContinent }
            }

            fragment CountryContinent on Country {
                continent {
                    ... on Continent { countries { name } }
                }
            }
            "#,
            None,
        )
        .expect("depths should be computed");

        assert_eq!(with_fragments, inlined);
        assert_eq!(with_fragments.field_depth("Query", "countries"), Some(3));
    }

    #[test]
    fn aliased_root_fields_report_the_deepest_occurrence() {
        let depths = depths_of(
            r#"{
                shallow: countries { code }
                deep: countries { continent { code } }
            }"#,
            None,
        )
        .expect("depths should be computed");

        assert_eq!(depths.fields.len(), 1);
        assert_eq!(depths.field_depth("Query", "countries"), Some(2));
        assert_eq!(depths.document_depth, 3);
    }

    #[test]
    fn follows_union_and_interface_fragments() {
        let depths = depths_of(
            r#"{
                search(term: "po") {
                    __typename
                    ... on Country { continent { name } }
                    ... on Continent { countries { states { name } } }
                }
                node(code: "PL") { code ... on Country { languages { name } } }
            }"#,
            None,
        )
        .expect("depths should be computed");

        assert_eq!(depths.field_depth("Query", "search"), Some(3));
        assert_eq!(depths.field_depth("Query", "node"), Some(2));
        assert_eq!(depths.document_depth, 4);
    }

    #[test]
    fn walks_introspection_without_schema_types() {
        let depths = depths_of(
            r#"{
                __schema { types { name fields { name type { ...TypeRef } } } }
            }

            fragment TypeRef on __Type { kind name ofType { kind name } }
            "#,
            None,
        )
        .expect("depths should be computed");

        assert_eq!(depths.field_depth("Query", "__schema"), Some(5));
    }

    #[test]
    fn records_the_root_type_of_mutations() {
        let depths = depths_of(
            r#"mutation { putCountry(code: "PL", name: "Poland") { code continent { code } } }"#,
            None,
        )
        .expect("depths should be computed");

        assert_eq!(depths.fields[0].type_name, "Mutation");
        assert_eq!(depths.field_depth("Mutation", "putCountry"), Some(2));
        assert_eq!(depths.field_depth("Query", "putCountry"), None);
    }

    #[test]
    fn rejects_fields_unknown_to_the_schema() {
        let err = depths_of("{ countries { population } }", None).expect_err("should fail");

        assert_eq!(err.to_string(), "Field 'population' not found in type 'Country'.");
    }

    #[test]
    fn rejects_unknown_and_cyclic_fragments() {
        let err = depths_of("{ countries { ...Missing } }", None).expect_err("should fail");
        assert!(matches!(err, AnalysisError::FragmentDefinitionNotFound { .. }));

        let err = depths_of(
            r#"
            { countries { ...A } }
            fragment A on Country { continent { countries { ...A } } }
            "#,
            None,
        )
        .expect_err("should fail");
        assert!(matches!(err, AnalysisError::FragmentCycle { .. }));
    }

    #[test]
    fn serializes_depths_for_reporting() {
        let depths = depths_of("{ countries { code } languages { name } }", None)
            .expect("depths should be computed");

        assert_eq!(
            serde_json::to_value(&depths).expect("depths should serialize"),
            serde_json::json!({
                "fields": [
                    { "type_name": "Query", "field_name": "countries", "depth": 1 },
                    { "type_name": "Query", "field_name": "languages", "depth": 1 }
                ],
                "document_depth": 2
            })
        );
    }

    #[test]
    fn reuses_fragment_depth_across_spreads() {
        let depths = depths_of(
            r#"
            {
                countries { ...Names continent { countries { ...Names } } }
            }
            fragment Names on Country { name languages { name } }
            "#,
            None,
        )
        .expect("depths should be computed");

        assert_eq!(depths.field_depth("Query", "countries"), Some(4));
    }

    #[test]
    fn rejects_operations_without_a_root_type() {
        let err = depths_of("subscription { countries { code } }", None).expect_err("should fail");

        assert!(matches!(err, AnalysisError::RootTypeNotFound { .. }));
    }
}
