//! Post-processing passes run once over the base document.

use crate::dependency::DependencyNode;
use crate::error::{BulwarkError, Result};
use crate::exception::GENERIC_ERROR_MESSAGE;
use crate::openapi::{ModelRegistry, merge_responses, object_entry};
use serde_json::{Map, Value, json};

/// Name of the component schema describing the catch-all 500 body
pub const INTERNAL_SERVER_ERROR_COMPONENT: &str = "InternalServerError";

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// The dependency tree of one documented operation
#[derive(Clone, Copy)]
pub struct OperationRef<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub dependencies: &'a [DependencyNode],
}

/// Apply every pass, in order. The document is left unusable on error.
pub fn enrich<'a, I>(document: &mut Value, operations: I, models: &ModelRegistry) -> Result<()>
where
    I: IntoIterator<Item = OperationRef<'a>>,
{
    ensure_component_name_free(document)?;
    simplify_nullable_parameters(document);
    merge_dependency_responses(document, operations, models)?;
    add_internal_server_error(document);
    Ok(())
}

/// `InternalServerError` belongs to this crate; an existing definition is
/// never overwritten.
pub fn ensure_component_name_free(document: &Value) -> Result<()> {
    let exists = document
        .pointer("/components/schemas")
        .and_then(Value::as_object)
        .is_some_and(|schemas| schemas.contains_key(INTERNAL_SERVER_ERROR_COMPONENT));

    if exists {
        return Err(BulwarkError::ComponentCollision {
            name: INTERNAL_SERVER_ERROR_COMPONENT.to_string(),
        });
    }
    Ok(())
}

/// Drop `{"type": "null"}` alternatives from query and path parameter
/// unions, collapsing a union left with a single alternative.
pub fn simplify_nullable_parameters(document: &mut Value) {
    for operation in operations_mut(document) {
        let Some(parameters) = operation.get_mut("parameters").and_then(Value::as_array_mut) else {
            continue;
        };

        for parameter in parameters {
            let location = parameter.get("in").and_then(Value::as_str);
            if !matches!(location, Some("query" | "path")) {
                continue;
            }
            if let Some(schema) = parameter.get_mut("schema").and_then(Value::as_object_mut) {
                strip_null_alternative(schema);
            }
        }
    }
}

fn strip_null_alternative(schema: &mut Map<String, Value>) {
    let key = if schema.contains_key("anyOf") {
        "anyOf"
    } else if schema.contains_key("oneOf") {
        "oneOf"
    } else {
        return;
    };

    let Some(Value::Array(alternatives)) = schema.remove(key) else {
        return;
    };
    let mut remaining: Vec<Value> = alternatives
        .into_iter()
        .filter(|alternative| alternative.get("type").and_then(Value::as_str) != Some("null"))
        .collect();

    match remaining.pop() {
        Some(Value::Object(single)) if remaining.is_empty() => schema.extend(single),
        Some(last) => {
            remaining.push(last);
            schema.insert(key.to_string(), Value::Array(remaining));
        }
        None => {
            schema.insert(key.to_string(), Value::Array(remaining));
        }
    }
}

/// Merge the error responses declared by each operation's dependency tree
/// into the operation's responses.
pub fn merge_dependency_responses<'a, I>(
    document: &mut Value,
    operations: I,
    models: &ModelRegistry,
) -> Result<()>
where
    I: IntoIterator<Item = OperationRef<'a>>,
{
    for target in operations {
        let pointer = format!(
            "/paths/{}/{}",
            escape_pointer(target.path),
            target.method
        );
        let operation = document
            .pointer_mut(&pointer)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| BulwarkError::OperationMissing {
                path: target.path.to_string(),
                method: target.method.to_uppercase(),
            })?;
        let responses = object_entry(operation, "responses");

        for node in target.dependencies {
            add_dependency_responses(node, responses, models)?;
        }
    }
    Ok(())
}

fn add_dependency_responses(
    node: &DependencyNode,
    responses: &mut Map<String, Value>,
    models: &ModelRegistry,
) -> Result<()> {
    if let Some(declared) = node.call().and_then(|call| call.declared_responses()) {
        for (status, decl) in declared.error_responses().iter() {
            let response = decl.materialize(models)?;
            let status = status.to_string();

            let merged = match responses.get(&status).and_then(Value::as_object) {
                Some(existing) => merge_responses([existing, &response])?,
                None => response,
            };
            responses.insert(status, Value::Object(merged));
        }
    }

    for sub in node.dependencies() {
        add_dependency_responses(sub, responses, models)?;
    }
    Ok(())
}

/// JSON Schema of the body produced by the catch-all layer
pub fn internal_server_error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "detail": {
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "examples": [GENERIC_ERROR_MESSAGE],
                    },
                    "traceback": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only included when debug mode is enabled",
                    },
                },
                "required": ["message"],
            },
        },
        "required": ["detail"],
    })
}

/// Register the `InternalServerError` component and give every operation
/// without a 500 response one that references it.
pub fn add_internal_server_error(document: &mut Value) {
    if let Some(root) = document.as_object_mut() {
        let components = object_entry(root, "components");
        object_entry(components, "schemas").insert(
            INTERNAL_SERVER_ERROR_COMPONENT.to_string(),
            internal_server_error_schema(),
        );
    }

    let reference = format!("#/components/schemas/{INTERNAL_SERVER_ERROR_COMPONENT}");
    for operation in operations_mut(document) {
        let responses = object_entry(operation, "responses");
        if !responses.contains_key("500") {
            responses.insert(
                "500".to_string(),
                json!({
                    "description": "Internal Server Error",
                    "content": {
                        "application/json": { "schema": { "$ref": reference } }
                    },
                }),
            );
        }
    }
}

fn operations_mut(document: &mut Value) -> impl Iterator<Item = &mut Map<String, Value>> {
    document
        .get_mut("paths")
        .and_then(Value::as_object_mut)
        .into_iter()
        .flat_map(|paths| paths.values_mut())
        .filter_map(Value::as_object_mut)
        .flat_map(|item| {
            item.iter_mut()
                .filter(|(method, _)| HTTP_METHODS.contains(&method.as_str()))
                .filter_map(|(_, operation)| operation.as_object_mut())
        })
}

/// Escape a path for use as a JSON pointer token
fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{DeclaresErrorResponses, Dependency, DependencyResult};
    use crate::openapi::{ErrorResponses, ResponseDecl};
    use async_trait::async_trait;
    use axum::http::request::Parts;

    struct Declares(ErrorResponses);

    #[async_trait]
    impl Dependency for Declares {
        async fn resolve(&self, _parts: &Parts) -> DependencyResult {
            Ok(())
        }

        fn declared_responses(&self) -> Option<&dyn DeclaresErrorResponses> {
            Some(self)
        }
    }

    impl DeclaresErrorResponses for Declares {
        fn error_responses(&self) -> ErrorResponses {
            self.0.clone()
        }
    }

    struct Silent;

    #[async_trait]
    impl Dependency for Silent {
        async fn resolve(&self, _parts: &Parts) -> DependencyResult {
            Ok(())
        }
    }

    fn declares(status: u16, decl: ResponseDecl) -> DependencyNode {
        DependencyNode::new(Declares(ErrorResponses::new().with(status, decl)))
    }

    fn document_with(operation: Value) -> Value {
        json!({
            "openapi": "3.1.0",
            "info": { "title": "t", "version": "1" },
            "paths": { "/items/{id}": { "get": operation } },
        })
    }

    fn run_merge(document: &mut Value, dependencies: &[DependencyNode]) -> Result<()> {
        merge_dependency_responses(
            document,
            [OperationRef {
                path: "/items/{id}",
                method: "get",
                dependencies,
            }],
            &ModelRegistry::new(),
        )
    }

    #[test]
    fn test_nullable_query_parameter_collapses() {
        let mut document = document_with(json!({
            "parameters": [{
                "name": "q",
                "in": "query",
                "schema": { "anyOf": [{ "type": "string" }, { "type": "null" }], "title": "Q" }
            }],
            "responses": {}
        }));

        simplify_nullable_parameters(&mut document);

        assert_eq!(
            document["paths"]["/items/{id}"]["get"]["parameters"][0]["schema"],
            json!({ "title": "Q", "type": "string" })
        );
    }

    #[test]
    fn test_only_null_alternative_is_dropped() {
        let mut document = document_with(json!({
            "parameters": [{
                "name": "id",
                "in": "path",
                "schema": { "oneOf": [
                    { "type": "string" },
                    { "type": "integer" },
                    { "type": "null" },
                    { "type": "boolean" }
                ] }
            }]
        }));

        simplify_nullable_parameters(&mut document);

        assert_eq!(
            document["paths"]["/items/{id}"]["get"]["parameters"][0]["schema"],
            json!({ "oneOf": [{ "type": "string" }, { "type": "integer" }, { "type": "boolean" }] })
        );
    }

    #[test]
    fn test_header_parameters_are_left_alone() {
        let schema = json!({ "anyOf": [{ "type": "string" }, { "type": "null" }] });
        let mut document = document_with(json!({
            "parameters": [{ "name": "x-trace", "in": "header", "schema": schema }]
        }));

        simplify_nullable_parameters(&mut document);

        assert_eq!(
            document["paths"]["/items/{id}"]["get"]["parameters"][0]["schema"],
            schema
        );
    }

    #[test]
    fn test_any_of_wins_over_one_of() {
        let mut document = document_with(json!({
            "parameters": [{
                "name": "q",
                "in": "query",
                "schema": {
                    "anyOf": [{ "type": "integer" }, { "type": "null" }],
                    "oneOf": [{ "type": "string" }, { "type": "null" }]
                }
            }]
        }));

        simplify_nullable_parameters(&mut document);

        let schema = &document["paths"]["/items/{id}"]["get"]["parameters"][0]["schema"];
        assert_eq!(schema["type"], "integer");
        assert!(schema.get("anyOf").is_none());
        assert_eq!(schema["oneOf"], json!([{ "type": "string" }, { "type": "null" }]));
    }

    #[test]
    fn test_two_dependencies_declaring_401_merge() {
        let mut document = document_with(json!({ "responses": {} }));
        let dependencies = [
            declares(
                401,
                ResponseDecl::new("A").content("application/json", json!({ "type": "string" })),
            ),
            declares(
                401,
                ResponseDecl::new("B").content("application/json", json!({ "type": "integer" })),
            ),
        ];

        run_merge(&mut document, &dependencies).unwrap();

        assert_eq!(
            document["paths"]["/items/{id}"]["get"]["responses"]["401"],
            json!({
                "description": "A / B",
                "content": { "application/json": { "schema": {
                    "oneOf": [{ "type": "string" }, { "type": "integer" }]
                } } }
            })
        );
    }

    #[test]
    fn test_nested_dependencies_are_walked_depth_first() {
        let mut document = document_with(json!({
            "responses": { "200": { "description": "OK" } }
        }));
        let outer = declares(401, ResponseDecl::new("Outer"))
            .depends_on(declares(401, ResponseDecl::new("Inner")));
        let group =
            DependencyNode::group().depends_on(declares(403, ResponseDecl::new("Forbidden")));
        let tree = DependencyNode::new(Silent).depends_on(outer).depends_on(group);
        let sibling = declares(401, ResponseDecl::new("Sibling"));

        run_merge(&mut document, &[tree, sibling]).unwrap();

        let responses = &document["paths"]["/items/{id}"]["get"]["responses"];
        assert_eq!(responses["401"]["description"], "Outer / Inner / Sibling");
        assert_eq!(responses["403"], json!({ "description": "Forbidden" }));
        assert_eq!(responses["200"], json!({ "description": "OK" }));
    }

    #[test]
    fn test_missing_responses_object_is_created() {
        let mut document = document_with(json!({}));
        run_merge(&mut document, &[declares(429, ResponseDecl::new("Slow down"))]).unwrap();

        assert_eq!(
            document["paths"]["/items/{id}"]["get"]["responses"]["429"]["description"],
            "Slow down"
        );
    }

    #[test]
    fn test_missing_operation_is_a_configuration_error() {
        let mut document = document_with(json!({}));
        let error = merge_dependency_responses(
            &mut document,
            [OperationRef {
                path: "/gone",
                method: "post",
                dependencies: &[],
            }],
            &ModelRegistry::new(),
        )
        .unwrap_err();

        assert!(matches!(
            error,
            BulwarkError::OperationMissing { ref path, ref method }
                if path == "/gone" && method == "POST"
        ));
    }

    #[test]
    fn test_500_is_added_only_where_missing() {
        let custom = json!({ "description": "Database unavailable" });
        let mut document = json!({
            "paths": {
                "/a": { "get": { "responses": { "500": custom } }, "summary": "path-level field" },
                "/b": { "post": {} }
            }
        });

        add_internal_server_error(&mut document);

        assert_eq!(document["paths"]["/a"]["get"]["responses"]["500"], custom);
        let added = &document["paths"]["/b"]["post"]["responses"]["500"];
        assert_eq!(
            added["content"]["application/json"]["schema"],
            json!({ "$ref": "#/components/schemas/InternalServerError" })
        );
        assert_eq!(document["paths"]["/a"]["summary"], "path-level field");
        assert_eq!(
            document["components"]["schemas"][INTERNAL_SERVER_ERROR_COMPONENT],
            internal_server_error_schema()
        );
    }

    #[test]
    fn test_collision_stops_before_other_passes() {
        let mut document = document_with(json!({
            "parameters": [{
                "name": "q",
                "in": "query",
                "schema": { "anyOf": [{ "type": "string" }, { "type": "null" }] }
            }]
        }));
        document["components"] =
            json!({ "schemas": { "InternalServerError": { "type": "string" } } });
        let before = document.clone();

        let error = enrich(&mut document, [], &ModelRegistry::new()).unwrap_err();

        assert!(matches!(error, BulwarkError::ComponentCollision { .. }));
        assert_eq!(document, before);
    }
}
