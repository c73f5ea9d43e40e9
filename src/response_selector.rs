//! Picking the response to mock for a matched operation.
//!
//! Every lookup walks a status preference list head first and falls through to the
//! tail when the head is not declared.

use crate::document::{get_in, Document};
use crate::error::{Error, Result};
use crate::path_matcher::Endpoint;
use log::debug;
use serde_json::{Map, Value};

/// Status codes tried, in order, when choosing which response to sample.
pub const DEFAULT_STATUS_PREFERENCE: [u16; 4] = [200, 201, 203, 204];

/// Media type whose schema and example are sampled.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Returns the first status in `preference` declared under the operation's `responses`.
pub fn select_status(document: &Document, endpoint: &Endpoint, preference: &[u16]) -> Result<u16> {
    match preference.split_first() {
        Some((status, rest)) => {
            if response(document, endpoint, *status).is_some() {
                debug!("Selected status {} for {}", status, endpoint);
                Ok(*status)
            } else {
                select_status(document, endpoint, rest)
            }
        }
        None => Err(Error::NoStatusDefined {
            path: endpoint.path_template.clone(),
            method: endpoint.method.as_str().to_string(),
        }),
    }
}

/// Returns the JSON schema of the first preferred status declaring one.
///
/// Yields an empty mapping when no preferred status declares a schema.
pub fn select_schema(document: &Document, endpoint: &Endpoint, preference: &[u16]) -> Value {
    select_media_field(document, endpoint, preference, "schema")
}

/// Returns the JSON `example` of the first preferred status declaring one.
///
/// Yields an empty mapping when no preferred status declares an example.
pub fn select_example(document: &Document, endpoint: &Endpoint, preference: &[u16]) -> Value {
    select_media_field(document, endpoint, preference, "example")
}

/// Returns the first entry of the JSON `examples` map of the first preferred status
/// declaring one. The entry is an Example object (or a `$ref` to one); its payload
/// lives under `value` once resolved.
pub fn select_named_example(
    document: &Document,
    endpoint: &Endpoint,
    preference: &[u16],
) -> Option<Value> {
    match preference.split_first() {
        Some((status, rest)) => media_type(document, endpoint, *status)
            .and_then(|media| media.get("examples"))
            .and_then(Value::as_object)
            .and_then(|examples| examples.values().next().cloned())
            .or_else(|| select_named_example(document, endpoint, rest)),
        None => None,
    }
}

fn select_media_field(
    document: &Document,
    endpoint: &Endpoint,
    preference: &[u16],
    field: &str,
) -> Value {
    match preference.split_first() {
        Some((status, rest)) => match media_type(document, endpoint, *status).and_then(|m| m.get(field)) {
            Some(value) => value.clone(),
            None => select_media_field(document, endpoint, rest, field),
        },
        None => Value::Object(Map::new()),
    }
}

fn response<'a>(document: &'a Document, endpoint: &Endpoint, status: u16) -> Option<&'a Value> {
    let status = status.to_string();
    document.get_in(&[
        "paths",
        endpoint.path_template.as_str(),
        endpoint.method.as_str(),
        "responses",
        status.as_str(),
    ])
}

/// The `application/json` media type object of a response.
///
/// Falls back to a parameterised or structured-syntax JSON media type
/// (`application/json; charset=utf-8`, `application/problem+json`) when the plain one
/// is not declared.
fn media_type<'a>(document: &'a Document, endpoint: &Endpoint, status: u16) -> Option<&'a Value> {
    let content = get_in(response(document, endpoint, status)?, &["content"])?.as_object()?;
    content.get(JSON_MEDIA_TYPE).or_else(|| {
        content
            .iter()
            .find(|(name, _)| name.starts_with(JSON_MEDIA_TYPE) || name.ends_with("+json"))
            .map(|(_, media)| media)
    })
}
