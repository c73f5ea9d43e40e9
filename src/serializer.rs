//! Serialization of response bodies and endpoint listings.
//!
//! This module turns mocked bodies into JSON text and writes them to files or returns
//! them as strings.

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes a value to JSON text.
///
/// With `pretty` the output is indented for human review; otherwise it is compact, as
/// sent over the wire.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_mock::serializer::serialize_json;
/// use serde_json::json;
///
/// let text = serialize_json(&json!({"id": 0}), false).unwrap();
/// assert_eq!(text, r#"{"id":0}"#);
/// ```
pub fn serialize_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    debug!("Serializing body to JSON (pretty: {})", pretty);
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.context("Failed to serialize body to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
