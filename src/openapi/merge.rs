//! Combining response objects declared for the same status.

use crate::error::{BulwarkError, Result};
use serde_json::{Map, Value, json};

const DEFAULT_DESCRIPTION: &str = "Successful response";

#[derive(Default)]
struct MediaTypeParts {
    schemas: Vec<Value>,
    examples: Map<String, Value>,
}

/// Merge response objects into one.
///
/// - descriptions are joined with `" / "`
/// - per media type, distinct schemas are kept in first-seen order and become
///   a `oneOf` when there is more than one; a missing schema counts as `{}`
/// - named examples are all kept; a repeated name gets the first free
///   `_1`, `_2`, ... suffix
///
/// `headers`, `links`, a media-type `example` and media-type `encoding` have
/// no sensible union and are rejected. Other fields are not carried over.
pub fn merge_responses<'a, I>(responses: I) -> Result<Map<String, Value>>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut descriptions = Vec::new();
    let mut content: Vec<(String, MediaTypeParts)> = Vec::new();

    for response in responses {
        if let Some(description) = response.get("description").and_then(Value::as_str) {
            if !description.is_empty() {
                descriptions.push(description.to_string());
            }
        }

        for field in ["headers", "links"] {
            if is_set(response.get(field)) {
                return Err(BulwarkError::unsupported_merge(field));
            }
        }

        let Some(media_types) = response.get("content").and_then(Value::as_object) else {
            continue;
        };

        for (media_type, media) in media_types {
            let index = match content.iter().position(|(name, _)| name == media_type) {
                Some(index) => index,
                None => {
                    content.push((media_type.clone(), MediaTypeParts::default()));
                    content.len() - 1
                }
            };
            let parts = &mut content[index].1;

            for field in ["example", "encoding"] {
                if is_set(media.get(field)) {
                    return Err(BulwarkError::unsupported_merge(field));
                }
            }

            // No schema means any JSON value.
            let schema = media.get("schema").cloned().unwrap_or_else(|| json!({}));
            if !parts.schemas.contains(&schema) {
                parts.schemas.push(schema);
            }

            if let Some(examples) = media.get("examples").and_then(Value::as_object) {
                for (name, example) in examples {
                    insert_example(&mut parts.examples, name, example.clone());
                }
            }
        }
    }

    let mut merged = Map::new();
    let description = if descriptions.is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        descriptions.join(" / ")
    };
    merged.insert("description".to_string(), Value::String(description));

    if !content.is_empty() {
        let mut merged_content = Map::new();
        for (media_type, mut parts) in content {
            let mut entry = Map::new();
            match parts.schemas.len() {
                0 => {}
                1 => {
                    entry.insert("schema".to_string(), parts.schemas.remove(0));
                }
                _ => {
                    let mut union = Map::new();
                    union.insert("oneOf".to_string(), Value::Array(parts.schemas));
                    entry.insert("schema".to_string(), Value::Object(union));
                }
            }
            if !parts.examples.is_empty() {
                entry.insert("examples".to_string(), Value::Object(parts.examples));
            }
            merged_content.insert(media_type, Value::Object(entry));
        }
        merged.insert("content".to_string(), Value::Object(merged_content));
    }

    Ok(merged)
}

fn insert_example(examples: &mut Map<String, Value>, name: &str, example: Value) {
    if !examples.contains_key(name) {
        examples.insert(name.to_string(), example);
        return;
    }

    let mut suffix = 1;
    while examples.contains_key(&format!("{name}_{suffix}")) {
        suffix += 1;
    }
    examples.insert(format!("{name}_{suffix}"), example);
}

/// JSON truthiness: absent, null, false, 0, "" and empty containers are unset.
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
