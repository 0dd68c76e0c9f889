//! Base OpenAPI document generated from registered routes.

use crate::error::Result;
use crate::openapi::{ErrorResponses, ModelRegistry, ResponseDecl, StatusKey};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const OPENAPI_VERSION: &str = "3.1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

/// An operation parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: Value) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParameterLocation::Path,
            description: None,
            schema,
        }
    }

    pub fn query(name: impl Into<String>, schema: Value) -> Self {
        Self::new(name, ParameterLocation::Query, schema)
    }

    /// Path parameters are always required
    pub fn path(name: impl Into<String>, schema: Value) -> Self {
        Self::new(name, ParameterLocation::Path, schema)
    }

    pub fn header(name: impl Into<String>, schema: Value) -> Self {
        Self::new(name, ParameterLocation::Header, schema)
    }

    pub fn cookie(name: impl Into<String>, schema: Value) -> Self {
        Self::new(name, ParameterLocation::Cookie, schema)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParameterLocation::Path;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Everything the document needs to know about one `(path, method)`
#[derive(Debug, Clone)]
pub struct OperationDoc {
    pub path: String,
    /// Lowercase method name as used in OpenAPI path items
    pub method: String,
    pub operation_id: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub success_status: StatusKey,
    pub success: ResponseDecl,
    pub responses: ErrorResponses,
}

impl OperationDoc {
    fn to_value(&self, models: &ModelRegistry) -> Result<Value> {
        let mut operation = Map::new();
        if !self.tags.is_empty() {
            operation.insert("tags".to_string(), json!(self.tags));
        }
        if let Some(summary) = &self.summary {
            operation.insert("summary".to_string(), json!(summary));
        }
        operation.insert("operationId".to_string(), json!(self.operation_id));
        if !self.parameters.is_empty() {
            operation.insert(
                "parameters".to_string(),
                serde_json::to_value(&self.parameters)?,
            );
        }

        let mut responses = Map::new();
        responses.insert(
            self.success_status.to_string(),
            Value::Object(self.success.materialize(models)?),
        );
        for (status, response) in self.responses.iter() {
            responses.insert(status.to_string(), Value::Object(response.materialize(models)?));
        }
        operation.insert("responses".to_string(), Value::Object(responses));

        Ok(Value::Object(operation))
    }
}

/// Builds the document the enrichment passes start from
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    title: String,
    version: String,
    operations: Vec<OperationDoc>,
    component_schemas: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            operations: Vec::new(),
            component_schemas: Map::new(),
        }
    }

    pub fn operation(mut self, operation: OperationDoc) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn component_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.component_schemas.insert(name.into(), schema);
        self
    }

    /// The document without any operations
    pub fn skeleton(&self) -> Value {
        let mut document = json!({
            "openapi": OPENAPI_VERSION,
            "info": { "title": self.title, "version": self.version },
            "paths": {},
        });
        if !self.component_schemas.is_empty() {
            document["components"] = json!({ "schemas": self.component_schemas });
        }
        document
    }

    pub fn build(&self, models: &ModelRegistry) -> Result<Value> {
        let mut paths = Map::new();
        for operation in &self.operations {
            let path_item = paths
                .entry(operation.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(path_item) = path_item {
                path_item.insert(operation.method.clone(), operation.to_value(models)?);
            }
        }

        let mut document = self.skeleton();
        document["paths"] = Value::Object(paths);
        Ok(document)
    }
}

/// Default `operationId`: the method followed by the path's identifier characters
pub fn default_operation_id(method: &str, path: &str) -> String {
    let mut id = String::from(method);
    for segment in path
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
    {
        id.push('_');
        id.push_str(segment);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(path: &str, method: &str) -> OperationDoc {
        OperationDoc {
            path: path.to_string(),
            method: method.to_string(),
            operation_id: default_operation_id(method, path),
            summary: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            success_status: StatusKey::from(200u16),
            success: ResponseDecl::new("Successful Response"),
            responses: ErrorResponses::new(),
        }
    }

    #[test]
    fn test_default_operation_id() {
        assert_eq!(default_operation_id("get", "/ping"), "get_ping");
        assert_eq!(
            default_operation_id("delete", "/users/{user_id}/keys"),
            "delete_users_user_id_keys"
        );
        assert_eq!(default_operation_id("get", "/"), "get");
    }

    #[test]
    fn test_path_parameters_are_required() {
        let param = Parameter::path("id", json!({ "type": "integer" })).required(false);
        assert!(param.required);
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({ "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } })
        );
    }

    #[test]
    fn test_builds_paths_and_components() {
        let mut users = operation("/users/{id}", "get");
        users.summary = Some("Fetch a user".to_string());
        users.tags = vec!["users".to_string()];
        users.parameters = vec![Parameter::path("id", json!({ "type": "integer" }))];
        users.responses = ErrorResponses::new().with(404, ResponseDecl::new("Not Found"));

        let document = DocumentBuilder::new("Orders", "1.0.0")
            .operation(users)
            .operation(operation("/users/{id}", "delete"))
            .component_schema("User", json!({ "type": "object" }))
            .build(&ModelRegistry::new())
            .unwrap();

        assert_eq!(document["openapi"], OPENAPI_VERSION);
        assert_eq!(document["info"], json!({ "title": "Orders", "version": "1.0.0" }));
        let item = document["paths"]["/users/{id}"].as_object().unwrap();
        assert_eq!(item.keys().collect::<Vec<_>>(), vec!["get", "delete"]);
        assert_eq!(item["get"]["operationId"], "get_users_id");
        assert_eq!(item["get"]["tags"], json!(["users"]));
        assert_eq!(
            item["get"]["responses"],
            json!({
                "200": { "description": "Successful Response" },
                "404": { "description": "Not Found" }
            })
        );
        assert!(item["delete"].get("parameters").is_none());
        assert_eq!(document["components"]["schemas"]["User"], json!({ "type": "object" }));
    }

    #[test]
    fn test_no_components_without_schemas() {
        let document = DocumentBuilder::new("Empty", "0.0.1")
            .build(&ModelRegistry::new())
            .unwrap();
        assert!(document.get("components").is_none());
        assert_eq!(document["paths"], json!({}));
    }
}
