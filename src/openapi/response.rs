//! Response declarations contributed by routes and dependencies.

use crate::error::{BulwarkError, Result};
use crate::openapi::object_entry;
use axum::http::StatusCode;
use dashmap::DashMap;
use schemars::{JsonSchema, Schema};
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

const JSON_MEDIA_TYPE: &str = "application/json";

/// A response key of an OpenAPI operation: `"401"`, `"4XX"` or `"default"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusKey(String);

impl StatusKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u16> for StatusKey {
    fn from(status: u16) -> Self {
        Self(status.to_string())
    }
}

impl From<StatusCode> for StatusKey {
    fn from(status: StatusCode) -> Self {
        Self::from(status.as_u16())
    }
}

impl From<&str> for StatusKey {
    fn from(status: &str) -> Self {
        Self(status.trim().to_string())
    }
}

impl From<String> for StatusKey {
    fn from(status: String) -> Self {
        Self::from(status.as_str())
    }
}

/// A payload type whose JSON Schema describes a response body.
#[derive(Debug, Clone)]
pub enum ModelRef {
    /// A Rust type, schema generated with schemars
    Schema {
        name: Cow<'static, str>,
        generate: fn() -> Schema,
    },
    /// A model looked up by name in the application's [`ModelRegistry`]
    Named(String),
}

impl ModelRef {
    pub fn of<T: JsonSchema>() -> Self {
        ModelRef::Schema {
            name: T::schema_name(),
            generate: root_schema::<T>,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        ModelRef::Named(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ModelRef::Schema { name, .. } => name,
            ModelRef::Named(name) => name,
        }
    }

    /// Generate the JSON Schema of the model.
    ///
    /// Only object-shaped payloads are accepted.
    pub(crate) fn materialize(&self, registry: &ModelRegistry) -> Result<Value> {
        let generate = match self {
            ModelRef::Schema { generate, .. } => *generate,
            ModelRef::Named(name) => {
                registry
                    .generator(name)
                    .ok_or_else(|| BulwarkError::UnknownModel {
                        model: name.clone(),
                    })?
            }
        };

        let mut schema = serde_json::to_value(generate())?;
        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(BulwarkError::invalid_model(
                self.name(),
                "not a structured payload type (its schema is not an object)",
            ));
        }
        if let Some(object) = schema.as_object_mut() {
            object.remove("$schema");
        }
        Ok(schema)
    }
}

fn root_schema<T: JsonSchema>() -> Schema {
    schemars::schema_for!(T)
}

/// Models that response declarations may reference by name
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: Arc<DashMap<String, fn() -> Schema>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: JsonSchema>(&self) -> &Self {
        self.models
            .insert(T::schema_name().into_owned(), root_schema::<T>);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    fn generator(&self, name: &str) -> Option<fn() -> Schema> {
        self.models.get(name).map(|entry| *entry.value())
    }
}

/// An OpenAPI response object under construction.
///
/// Any response-object field may be set; `model` is replaced by an
/// `application/json` content entry holding the model's schema when the
/// document is built.
#[derive(Debug, Clone, Default)]
pub struct ResponseDecl {
    fields: Map<String, Value>,
    model: Option<ModelRef>,
}

impl ResponseDecl {
    pub fn new(description: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("description".to_string(), Value::String(description.into()));
        Self {
            fields,
            model: None,
        }
    }

    /// Parse a JSON response object.
    ///
    /// A string `model` key names a model registered on the application.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(BulwarkError::InvalidResponse(format!(
                "expected a JSON object, got {value}"
            )));
        };

        let model = match fields.remove("model") {
            None => None,
            Some(Value::String(name)) => Some(ModelRef::Named(name)),
            Some(other) => {
                return Err(BulwarkError::invalid_model(
                    other.to_string(),
                    "model must be referenced by name",
                ));
            }
        };

        Ok(Self { fields, model })
    }

    pub fn model<T: JsonSchema>(self) -> Self {
        self.model_ref(ModelRef::of::<T>())
    }

    pub fn model_ref(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the schema of one media type
    pub fn content(mut self, media_type: &str, schema: Value) -> Self {
        self.media_type(media_type)
            .insert("schema".to_string(), schema);
        self
    }

    /// Add a named example (`{"value": ...}`) to one media type
    pub fn example(mut self, media_type: &str, name: &str, value: Value) -> Self {
        object_entry(self.media_type(media_type), "examples")
            .insert(name.to_string(), json!({ "value": value }));
        self
    }

    /// Set any other response-object field (`headers`, `links`, extensions)
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.fields.get("description").and_then(Value::as_str)
    }

    fn media_type(&mut self, media_type: &str) -> &mut Map<String, Value> {
        let content = object_entry(&mut self.fields, "content");
        object_entry(content, media_type)
    }

    /// Produce the response object, with `model` turned into content.
    pub(crate) fn materialize(&self, registry: &ModelRegistry) -> Result<Map<String, Value>> {
        let mut response = self.fields.clone();
        if let Some(model) = &self.model {
            let schema = model.materialize(registry)?;
            response.insert(
                "content".to_string(),
                json!({ JSON_MEDIA_TYPE: { "schema": schema } }),
            );
        }
        Ok(response)
    }
}

/// An ordered status -> response mapping
#[derive(Debug, Clone, Default)]
pub struct ErrorResponses {
    entries: Vec<(StatusKey, ResponseDecl)>,
}

impl ErrorResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a response; a repeated status replaces the earlier declaration.
    pub fn with(mut self, status: impl Into<StatusKey>, response: ResponseDecl) -> Self {
        self.insert(status, response);
        self
    }

    pub fn insert(&mut self, status: impl Into<StatusKey>, response: ResponseDecl) {
        let status = status.into();
        match self.entries.iter_mut().find(|(key, _)| *key == status) {
            Some((_, existing)) => *existing = response,
            None => self.entries.push((status, response)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatusKey, &ResponseDecl)> {
        self.entries.iter().map(|(status, response)| (status, response))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
