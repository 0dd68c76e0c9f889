//! OpenAPI document generation and enrichment.
//!
//! The base document comes from the registered routes ([`DocumentBuilder`]).
//! [`enrich`] then runs, in order: the component-name guard, nullable
//! parameter simplification, dependency response merging and injection of
//! the `InternalServerError` response.

pub mod document;
pub mod enrich;
pub mod merge;
pub mod response;

pub use document::{DocumentBuilder, OperationDoc, Parameter, ParameterLocation};
pub use enrich::{INTERNAL_SERVER_ERROR_COMPONENT, OperationRef, enrich};
pub use merge::merge_responses;
pub use response::{ErrorResponses, ModelRef, ModelRegistry, ResponseDecl, StatusKey};

use serde_json::{Map, Value};

/// Get `key` as an object, replacing a missing or non-object value.
pub(crate) fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> &'a mut Map<String, Value> {
    let entry = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(object) => object,
        _ => unreachable!("entry was just made an object"),
    }
}
