//! Combining the sampled schema value with the author's example.

use serde_json::{Map, Value};

/// Deep-merges `overlay` into `base`.
///
/// Keys of `overlay` overwrite keys of `base`; nested objects merge recursively.
/// Arrays and scalars are replaced, never concatenated.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => *existing = deep_merge(existing.take(), value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Builds the response body from a sampled value and a resolved example.
///
/// Every key present in the example wins over the sampled structure, while keys only
/// the schema produced are kept. An empty side (absent, `null` or `{}`) leaves the
/// other side unchanged.
pub fn assemble(sampled: Option<Value>, example: Value) -> Value {
    match (sampled.filter(|v| !is_empty(v)), example) {
        (None, example) if is_empty(&example) => Value::Object(Map::new()),
        (None, example) => example,
        (Some(sampled), example) if is_empty(&example) => sampled,
        (Some(sampled), example) => deep_merge(sampled, example),
    }
}

/// `null` or an empty object.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
