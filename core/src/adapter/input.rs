//! # Input Builder
//!
//! Merges path parameters, query parameters and the request body into the
//! single value a procedure is called with.

use super::body::{BodyContent, RequestBody};
use super::path::PathInput;
use super::request::RequestHead;
use crate::procedure::{ErrorCode, OpenApiMethod, RpcError};
use crate::schema::Schema;
use bytes::Bytes;
use serde_json::{Map, Value};
use url::form_urlencoded;

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Builds the procedure input.
///
/// - Void input schemas yield `None` and the body is never read.
/// - Body-less methods read the query string, first occurrence of a key wins.
/// - Other methods parse the body by content type.
///
/// Path parameters are merged last and win over query or body keys.
pub async fn build_input(
    schema: &Schema,
    method: OpenApiMethod,
    path_input: &PathInput,
    head: &RequestHead,
    body: RequestBody,
    max_body_size: usize,
) -> Result<Option<Value>, RpcError> {
    if schema.is_void_like() {
        return Ok(None);
    }

    let base = if method.accepts_request_body() {
        let content = body.read(max_body_size).await?;
        parse_body(head.media_type().as_deref(), content)?
    } else {
        Some(Value::Object(query_object(head)))
    };

    Ok(Some(overlay_path(base, path_input)))
}

fn query_object(head: &RequestHead) -> Map<String, Value> {
    let mut query = Map::new();
    for (key, value) in head.query_pairs() {
        query.entry(key).or_insert(Value::String(value));
    }
    query
}

fn parse_body(media_type: Option<&str>, content: BodyContent) -> Result<Option<Value>, RpcError> {
    let bytes = match content {
        BodyContent::Parsed(value) => return Ok(Some(value)),
        BodyContent::Raw(bytes) if bytes.is_empty() => return Ok(None),
        BodyContent::Raw(bytes) => bytes,
    };

    match media_type {
        Some(JSON) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| parse_error().with_cause(e)),
        Some(FORM) => Ok(Some(Value::Object(form_object(&bytes)))),
        _ => raw_text(bytes).map(Some),
    }
}

/// Repeated keys collapse into an array of every occurrence, in order.
fn form_object(bytes: &[u8]) -> Map<String, Value> {
    let mut form = Map::new();
    for (key, value) in form_urlencoded::parse(bytes).into_owned() {
        match form.get_mut(&key) {
            None => {
                form.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    form
}

fn raw_text(bytes: Bytes) -> Result<Value, RpcError> {
    String::from_utf8(bytes.to_vec())
        .map(Value::String)
        .map_err(|e| parse_error().with_cause(e))
}

fn parse_error() -> RpcError {
    RpcError::new(ErrorCode::ParseError, "Failed to parse request body")
}

/// An absent base becomes an empty object. Non-object bases are returned unchanged.
fn overlay_path(base: Option<Value>, path_input: &PathInput) -> Value {
    match base {
        None => Value::Object(path_map(path_input, Map::new())),
        Some(Value::Object(map)) => Value::Object(path_map(path_input, map)),
        Some(other) => other,
    }
}

fn path_map(path_input: &PathInput, mut map: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in path_input {
        map.insert(key.clone(), Value::String(value.clone()));
    }
    map
}
