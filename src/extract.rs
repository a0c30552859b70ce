//! Typed parsing of the `{data:{<collection>:{items:[...]}}}` envelope.
//!
//! Absent or null nesting and empty collections are normal and yield no
//! records. Nesting of the wrong JSON type, or items that do not match the
//! record type, are schema drift and fail with [`AppError::Schema`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Returns the first record of `collection`, if any.
pub fn extract_one<T: DeserializeOwned>(response: &Value, collection: &str) -> Result<Option<T>> {
    match collection_items(response, collection)?.and_then(|items| items.first()) {
        Some(item) => parse_item(item, collection).map(Some),
        None => Ok(None),
    }
}

/// Returns every record of `collection`.
pub fn extract_many<T: DeserializeOwned>(response: &Value, collection: &str) -> Result<Vec<T>> {
    match collection_items(response, collection)? {
        Some(items) => items.iter().map(|item| parse_item(item, collection)).collect(),
        None => Ok(Vec::new()),
    }
}

fn collection_items<'a>(response: &'a Value, collection: &str) -> Result<Option<&'a Vec<Value>>> {
    let data = match response.get("data") {
        None | Some(Value::Null) => {
            if let Some(messages) = graphql_errors(response) {
                return Err(AppError::GraphQl(messages));
            }
            return Ok(None);
        }
        Some(Value::Object(data)) => data,
        Some(other) => return Err(unexpected("data", "an object", other)),
    };

    if let Some(messages) = graphql_errors(response) {
        tracing::warn!(errors = %messages, "GraphQL response carried partial errors");
    }

    let items = match data.get(collection) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(body)) => body.get("items"),
        Some(other) => return Err(unexpected(collection, "an object", other)),
    };

    match items {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(unexpected("items", "an array", other)),
    }
}

fn parse_item<T: DeserializeOwned>(item: &Value, collection: &str) -> Result<T> {
    T::deserialize(item).map_err(|e| AppError::Schema(format!("{} item: {}", collection, e)))
}

fn graphql_errors(response: &Value) -> Option<String> {
    let errors = response.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let messages: Vec<&str> = errors
        .iter()
        .map(|error| error.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
        .collect();
    Some(messages.join("; "))
}

fn unexpected(field: &str, expected: &str, found: &Value) -> AppError {
    let kind = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    AppError::Schema(format!("expected `{}` to be {}, found {}", field, expected, kind))
}
