//! Synthesizing representative values from resolved JSON schemas.
//!
//! The sampler only understands schemas whose `$ref`s have already been replaced.
//! An explicit `example` always wins; otherwise a value is built from the schema's
//! shape, falling back to fixed literals for primitive types. `None` means the schema
//! contributes nothing and the field is omitted.

use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use log::debug;
use rand::seq::SliceRandom;
use serde_json::{json, Map, Value};

/// How `oneOf`/`anyOf` alternatives are turned into samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompositionPolicy {
    /// Array items sample every alternative; other schemas take the first one
    #[default]
    Enumerate,
    /// Always the first alternative
    First,
    /// A random alternative on every request
    Random,
}

/// Schema sampler configured with a composition policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampler {
    policy: CompositionPolicy,
}

impl Sampler {
    pub fn new(policy: CompositionPolicy) -> Self {
        Self { policy }
    }

    /// Produces a sample value for `schema`, or `None` when nothing can be sampled.
    pub fn sample(&self, schema: &Value) -> Option<Value> {
        let schema = schema.as_object()?;

        if let Some(example) = schema.get("example") {
            return Some(example.clone());
        }

        let schema_type = match declared_type(schema) {
            Some(schema_type) => schema_type,
            None if schema.contains_key("properties") => "object",
            None if schema.contains_key("items") => "array",
            None => return self.sample_alternative(schema),
        };

        match schema_type {
            "object" => Some(self.sample_object(schema)),
            "array" => Some(self.sample_array(schema)),
            _ if schema.contains_key("enum") => sample_enum(schema),
            "file" => None,
            _ => Some(primitive(schema_type, schema)),
        }
    }

    fn sample_object(&self, schema: &Map<String, Value>) -> Value {
        let mut object = Map::new();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                if let Some(value) = self.sample(property) {
                    object.insert(name.clone(), value);
                }
            }
        }
        Value::Object(object)
    }

    fn sample_array(&self, schema: &Map<String, Value>) -> Value {
        let Some(items) = schema.get("items") else {
            return Value::Array(Vec::new());
        };

        let samples = match alternatives(items) {
            Some(choices) => match self.policy {
                CompositionPolicy::Enumerate => {
                    choices.iter().filter_map(|choice| self.sample(choice)).collect()
                }
                CompositionPolicy::First | CompositionPolicy::Random => self
                    .pick(choices)
                    .and_then(|choice| self.sample(choice))
                    .into_iter()
                    .collect(),
            },
            None => self.sample(items).into_iter().collect(),
        };
        Value::Array(samples)
    }

    /// A schema made only of `oneOf`/`anyOf` samples a single alternative.
    fn sample_alternative(&self, schema: &Map<String, Value>) -> Option<Value> {
        let choices = ["oneOf", "anyOf"]
            .into_iter()
            .find_map(|keyword| schema.get(keyword).and_then(Value::as_array))?;
        self.pick(choices).and_then(|choice| self.sample(choice))
    }

    fn pick<'a>(&self, choices: &'a [Value]) -> Option<&'a Value> {
        match self.policy {
            CompositionPolicy::Random => {
                let choice = choices.choose(&mut rand::thread_rng());
                debug!("Picked random alternative out of {}", choices.len());
                choice
            }
            CompositionPolicy::Enumerate | CompositionPolicy::First => choices.first(),
        }
    }
}

/// Samples `schema` with the default composition policy.
pub fn sample(schema: &Value) -> Option<Value> {
    Sampler::default().sample(schema)
}

/// The schema's `type`; for a list of types the first one other than `null`.
fn declared_type(schema: &Map<String, Value>) -> Option<&str> {
    match schema.get("type")? {
        Value::String(schema_type) => Some(schema_type.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|schema_type| *schema_type != "null"),
        _ => None,
    }
}

fn alternatives(items: &Value) -> Option<&Vec<Value>> {
    ["anyOf", "oneOf"]
        .into_iter()
        .find_map(|keyword| items.get(keyword).and_then(Value::as_array))
}

fn sample_enum(schema: &Map<String, Value>) -> Option<Value> {
    if let Some(default) = schema.get("default").filter(|d| !d.is_null()) {
        return Some(default.clone());
    }
    match schema.get("enum")? {
        Value::Array(values) => values.first().cloned(),
        single => Some(single.clone()),
    }
}

fn primitive(schema_type: &str, schema: &Map<String, Value>) -> Value {
    let format = schema.get("format").and_then(Value::as_str).unwrap_or_default();
    match (schema_type, format) {
        ("string", "email") => json!("user@example.com"),
        ("string", "date-time") => json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        ("string", "date") => json!(Utc::now().format("%Y-%m-%d").to_string()),
        ("string", "uuid") => json!("3fa85f64-5717-4562-b3fc-2c963f66afa6"),
        ("string", "hostname") => json!("example.com"),
        ("string", "ipv4") => json!("198.51.100.42"),
        ("string", "ipv6") => json!("2001:0db8:5b96:0000:0000:426f:8e17:642a"),
        ("string", _) => json!("string"),
        ("number", "float") => json!(0.0),
        ("number", _) | ("integer", _) => json!(0),
        ("boolean", _) => schema
            .get("default")
            .filter(|d| d.is_boolean())
            .cloned()
            .unwrap_or(Value::Bool(true)),
        (other, _) => json!(format!("Unknown Type: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_object_properties() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
        });
        assert_eq!(sample(&schema), Some(json!({"id": 0, "name": "string"})));
    }

    #[test]
    fn test_array_of_strings() {
        let schema = json!({"type": "array", "items": {"type": "string"}});
        assert_eq!(sample(&schema), Some(json!(["string"])));
    }

    #[test]
    fn test_enum_default_and_first() {
        assert_eq!(
            sample(&json!({"type": "string", "enum": ["a", "b", "c"], "default": "b"})),
            Some(json!("b"))
        );
        assert_eq!(
            sample(&json!({"type": "string", "enum": ["a", "b", "c"]})),
            Some(json!("a"))
        );
        assert_eq!(
            sample(&json!({"type": "string", "enum": "only"})),
            Some(json!("only"))
        );
    }

    #[test]
    fn test_example_wins_without_recursion() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "example": {"anything": [1, 2]}
        });
        assert_eq!(sample(&schema), Some(json!({"anything": [1, 2]})));
    }

    #[test]
    fn test_type_inference() {
        assert_eq!(
            sample(&json!({"properties": {"ok": {"type": "boolean"}}})),
            Some(json!({"ok": true}))
        );
        assert_eq!(sample(&json!({"items": {"type": "integer"}})), Some(json!([0])));
        assert_eq!(sample(&json!({"description": "untyped"})), None);
        assert_eq!(sample(&json!({})), None);
    }

    #[test]
    fn test_absent_properties_are_omitted() {
        let schema = json!({
            "type": "object",
            "properties": {
                "upload": {"type": "file"},
                "note": {"description": "no type"},
                "count": {"type": "integer"}
            }
        });
        assert_eq!(sample(&schema), Some(json!({"count": 0})));
    }

    #[test]
    fn test_array_items_alternatives_are_enumerated() {
        let schema = json!({
            "type": "array",
            "items": {"oneOf": [{"type": "string"}, {"type": "integer"}, {"type": "boolean"}]}
        });
        assert_eq!(sample(&schema), Some(json!(["string", 0, true])));

        let any_of = json!({"type": "array", "items": {"anyOf": [{"type": "number"}, {"type": "string", "format": "email"}]}});
        assert_eq!(sample(&any_of), Some(json!([0, "user@example.com"])));
    }

    #[test]
    fn test_first_policy_picks_one_alternative() {
        let sampler = Sampler::new(CompositionPolicy::First);
        let schema = json!({
            "type": "array",
            "items": {"oneOf": [{"type": "string"}, {"type": "integer"}]}
        });
        assert_eq!(sampler.sample(&schema), Some(json!(["string"])));
    }

    #[test]
    fn test_random_policy_picks_a_declared_alternative() {
        let sampler = Sampler::new(CompositionPolicy::Random);
        let schema = json!({"oneOf": [{"type": "string"}, {"type": "integer"}]});
        for _ in 0..20 {
            let value = sampler.sample(&schema).unwrap();
            assert!(value == json!("string") || value == json!(0), "got {value}");
        }
    }

    #[test]
    fn test_top_level_alternatives_sample_first() {
        let schema = json!({"anyOf": [{"type": "integer"}, {"type": "string"}]});
        assert_eq!(sample(&schema), Some(json!(0)));
    }

    #[test]
    fn test_primitive_table() {
        assert_eq!(sample(&json!({"type": "string"})), Some(json!("string")));
        assert_eq!(sample(&json!({"type": "string", "format": "byte"})), Some(json!("string")));
        assert_eq!(
            sample(&json!({"type": "string", "format": "uuid"})),
            Some(json!("3fa85f64-5717-4562-b3fc-2c963f66afa6"))
        );
        assert_eq!(
            sample(&json!({"type": "string", "format": "hostname"})),
            Some(json!("example.com"))
        );
        assert_eq!(
            sample(&json!({"type": "string", "format": "ipv4"})),
            Some(json!("198.51.100.42"))
        );
        assert_eq!(
            sample(&json!({"type": "string", "format": "ipv6"})),
            Some(json!("2001:0db8:5b96:0000:0000:426f:8e17:642a"))
        );
        assert_eq!(sample(&json!({"type": "number"})), Some(json!(0)));
        assert_eq!(sample(&json!({"type": "number", "format": "float"})), Some(json!(0.0)));
        assert_eq!(sample(&json!({"type": "integer", "format": "int64"})), Some(json!(0)));
        assert_eq!(sample(&json!({"type": "boolean"})), Some(json!(true)));
        assert_eq!(
            sample(&json!({"type": "boolean", "default": false})),
            Some(json!(false))
        );
        assert_eq!(
            sample(&json!({"type": "boolean", "default": "no"})),
            Some(json!(true))
        );
        assert_eq!(
            sample(&json!({"type": "tuple"})),
            Some(json!("Unknown Type: tuple"))
        );
    }

    #[test]
    fn test_dates_are_current() {
        let date_time = sample(&json!({"type": "string", "format": "date-time"})).unwrap();
        let parsed = DateTime::parse_from_rfc3339(date_time.as_str().unwrap()).unwrap();
        assert!((Utc::now() - parsed.with_timezone(&Utc)).num_seconds().abs() < 60);

        let date = sample(&json!({"type": "string", "format": "date"})).unwrap();
        assert!(NaiveDate::parse_from_str(date.as_str().unwrap(), "%Y-%m-%d").is_ok());
    }

    #[test]
    fn test_type_list_skips_null() {
        assert_eq!(
            sample(&json!({"type": ["null", "integer"]})),
            Some(json!(0))
        );
    }

    #[test]
    fn test_nested_arrays_and_objects() {
        let schema = json!({
            "type": "object",
            "properties": {
                "users": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "email": {"type": "string", "format": "email"},
                            "role": {"type": "string", "enum": ["admin", "user"]}
                        }
                    }
                },
                "missing_items": {"type": "array"}
            }
        });
        assert_eq!(
            sample(&schema),
            Some(json!({
                "users": [{"email": "user@example.com", "role": "admin"}],
                "missing_items": []
            }))
        );
    }
}
