//! Input schema validation.
//!
//! Action input schemas are written as JSON Schema literals (`json!({...})`)
//! so they can be handed to an LLM runtime unchanged. [`Schema`] checks the
//! subset of keywords the actions actually use and turns a raw input into
//! either a sanitized value (defaults filled in, `null` optionals dropped) or
//! a list of [`Violation`]s.
//!
//! Supported keywords: `type` (string or list), `enum`, `properties`,
//! `required`, `additionalProperties`, `default`, `items`, `minLength`,
//! `maxLength`, `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`,
//! `minItems`, `maxItems` and `errorMessage`, which replaces the generated
//! message for any violation of that field.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const KNOWN_TYPES: &[&str] = &["string", "number", "integer", "boolean", "object", "array", "null"];
const NUMERIC_KEYWORDS: &[&str] = &["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"];
const COUNT_KEYWORDS: &[&str] = &["minLength", "maxLength", "minItems", "maxItems"];

/// A schema that cannot be used for validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("schema must be a JSON object")]
    NotAnObject,

    #[error("top-level schema must declare \"type\": \"object\"")]
    RootNotObject,

    #[error("{path}: unknown type '{name}'")]
    UnknownType { path: String, name: String },

    #[error("{path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// One failed constraint, addressed by a dotted field path (`items[2].mint`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Outcome of validating an input against a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(Value),
    Invalid(Vec<Violation>),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn into_result(self) -> Result<Value, Vec<Violation>> {
        match self {
            Validation::Valid(value) => Ok(value),
            Validation::Invalid(violations) => Err(violations),
        }
    }
}

/// Render violations as a single message, in the order they were found.
pub fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A checked object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: Value,
}

impl Schema {
    /// Check the schema's own shape. The root must be an object schema.
    pub fn new(root: Value) -> Result<Self, SchemaError> {
        if !root.is_object() {
            return Err(SchemaError::NotAnObject);
        }
        if declared_types(&root).map_or(true, |types| types != ["object"]) {
            return Err(SchemaError::RootNotObject);
        }
        check_shape(&root, "")?;
        Ok(Self { root })
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Validate `input`. A `null` input is treated as an empty object so that
    /// tool runtimes may omit arguments for parameterless actions.
    pub fn validate(&self, input: &Value) -> Validation {
        let empty = Value::Object(Map::new());
        let input = if input.is_null() { &empty } else { input };

        let mut violations = Vec::new();
        let sanitized = check(&self.root, input, "", &mut violations);
        if violations.is_empty() {
            Validation::Valid(sanitized)
        } else {
            Validation::Invalid(violations)
        }
    }
}

fn declared_types(schema: &Value) -> Option<Vec<&str>> {
    match schema.get("type")? {
        Value::String(name) => Some(vec![name.as_str()]),
        Value::Array(names) => Some(names.iter().filter_map(Value::as_str).collect()),
        _ => None,
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn malformed(path: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::Malformed {
        path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
        reason: reason.into(),
    }
}

fn check_shape(schema: &Value, path: &str) -> Result<(), SchemaError> {
    let obj = schema
        .as_object()
        .ok_or_else(|| malformed(path, "subschema must be an object"))?;

    match obj.get("type") {
        None => {}
        Some(Value::String(name)) => {
            if !KNOWN_TYPES.contains(&name.as_str()) {
                return Err(SchemaError::UnknownType {
                    path: path.to_string(),
                    name: name.clone(),
                });
            }
        }
        Some(Value::Array(names)) => {
            for name in names {
                let name = name
                    .as_str()
                    .ok_or_else(|| malformed(path, "type list must contain strings"))?;
                if !KNOWN_TYPES.contains(&name) {
                    return Err(SchemaError::UnknownType {
                        path: path.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
        Some(_) => return Err(malformed(path, "type must be a string or a list of strings")),
    }

    if let Some(options) = obj.get("enum") {
        match options.as_array() {
            Some(options) if !options.is_empty() => {}
            _ => return Err(malformed(path, "enum must be a non-empty array")),
        }
    }

    for keyword in NUMERIC_KEYWORDS {
        if obj.get(*keyword).is_some_and(|v| !v.is_number()) {
            return Err(malformed(path, format!("{keyword} must be a number")));
        }
    }
    for keyword in COUNT_KEYWORDS {
        if obj.get(*keyword).is_some_and(|v| v.as_u64().is_none()) {
            return Err(malformed(path, format!("{keyword} must be a non-negative integer")));
        }
    }
    if obj.get("errorMessage").is_some_and(|v| !v.is_string()) {
        return Err(malformed(path, "errorMessage must be a string"));
    }

    let properties = match obj.get("properties") {
        None => None,
        Some(Value::Object(props)) => {
            for (key, sub) in props {
                check_shape(sub, &child_path(path, key))?;
            }
            Some(props)
        }
        Some(_) => return Err(malformed(path, "properties must be an object")),
    };

    if let Some(required) = obj.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| malformed(path, "required must be an array"))?;
        for key in required {
            let key = key
                .as_str()
                .ok_or_else(|| malformed(path, "required must contain strings"))?;
            if properties.map_or(true, |props| !props.contains_key(key)) {
                return Err(malformed(path, format!("required field '{key}' is not declared in properties")));
            }
        }
    }

    match obj.get("additionalProperties") {
        None | Some(Value::Bool(_)) => {}
        Some(sub @ Value::Object(_)) => check_shape(sub, &child_path(path, "*"))?,
        Some(_) => return Err(malformed(path, "additionalProperties must be a boolean or a schema")),
    }

    if let Some(items) = obj.get("items") {
        check_shape(items, &format!("{path}[]"))?;
    }

    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_type(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
            _ => false,
        },
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => false,
    }
}

fn accepts_null(schema: &Value) -> bool {
    declared_types(schema).is_some_and(|types| types.contains(&"null"))
}

fn check(schema: &Value, value: &Value, path: &str, out: &mut Vec<Violation>) -> Value {
    let before = out.len();
    let sanitized = check_node(schema, value, path, out);

    if let Some(custom) = schema.get("errorMessage").and_then(Value::as_str) {
        if out.len() > before {
            out.truncate(before);
            out.push(Violation::new(path, custom));
        }
    }
    sanitized
}

fn check_node(schema: &Value, value: &Value, path: &str, out: &mut Vec<Violation>) -> Value {
    if let Some(types) = declared_types(schema) {
        if !types.iter().any(|name| matches_type(name, value)) {
            out.push(Violation::new(
                path,
                format!("expected {}, received {}", types.join(" or "), type_name(value)),
            ));
            return value.clone();
        }
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(value) {
            let listed = options
                .iter()
                .map(|o| o.as_str().map_or_else(|| o.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join(", ");
            out.push(Violation::new(path, format!("must be one of: {listed}")));
            return value.clone();
        }
    }

    match value {
        Value::String(s) => {
            check_string(schema, s, path, out);
            value.clone()
        }
        Value::Number(n) => {
            if let Some(n) = n.as_f64() {
                check_number(schema, n, path, out);
            }
            value.clone()
        }
        Value::Array(items) => check_array(schema, items, path, out),
        Value::Object(map) => check_object(schema, map, path, out),
        _ => value.clone(),
    }
}

fn check_string(schema: &Value, s: &str, path: &str, out: &mut Vec<Violation>) {
    let len = s.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if len < min {
            out.push(Violation::new(path, format!("minimum length {min}")));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if len > max {
            out.push(Violation::new(path, format!("maximum length {max}")));
        }
    }
}

fn check_number(schema: &Value, n: f64, path: &str, out: &mut Vec<Violation>) {
    if let Some(bound) = schema.get("exclusiveMinimum") {
        if bound.as_f64().is_some_and(|b| n <= b) {
            let message = if bound.as_f64() == Some(0.0) {
                "must be positive".to_string()
            } else {
                format!("must be greater than {bound}")
            };
            out.push(Violation::new(path, message));
        }
    }
    if let Some(bound) = schema.get("minimum") {
        if bound.as_f64().is_some_and(|b| n < b) {
            out.push(Violation::new(path, format!("must be at least {bound}")));
        }
    }
    if let Some(bound) = schema.get("exclusiveMaximum") {
        if bound.as_f64().is_some_and(|b| n >= b) {
            out.push(Violation::new(path, format!("must be less than {bound}")));
        }
    }
    if let Some(bound) = schema.get("maximum") {
        if bound.as_f64().is_some_and(|b| n > b) {
            out.push(Violation::new(path, format!("must be at most {bound}")));
        }
    }
}

fn check_array(schema: &Value, items: &[Value], path: &str, out: &mut Vec<Violation>) -> Value {
    let count = items.len() as u64;
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if count < min {
            out.push(Violation::new(path, format!("must contain at least {min} item(s)")));
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if count > max {
            out.push(Violation::new(path, format!("must contain at most {max} item(s)")));
        }
    }

    match schema.get("items") {
        Some(item_schema) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| check(item_schema, item, &format!("{path}[{i}]"), out))
                .collect(),
        ),
        None => Value::Array(items.to_vec()),
    }
}

fn check_object(schema: &Value, map: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) -> Value {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut sanitized = Map::new();

    for (key, sub) in properties {
        let field_path = child_path(path, key);
        let is_required = required.contains(&key.as_str());
        let present = map
            .get(key)
            .filter(|v| is_required || !v.is_null() || accepts_null(sub));

        match present {
            Some(v) => {
                sanitized.insert(key.clone(), check(sub, v, &field_path, out));
            }
            None if is_required => out.push(Violation::new(field_path, "is required")),
            None => {
                if let Some(default) = sub.get("default") {
                    sanitized.insert(key.clone(), default.clone());
                }
            }
        }
    }

    for (key, v) in map {
        if properties.contains_key(key) {
            continue;
        }
        match schema.get("additionalProperties") {
            Some(Value::Bool(false)) => {
                out.push(Violation::new(child_path(path, key), "unknown field"));
            }
            Some(extra @ Value::Object(_)) => {
                let checked = check(extra, v, &child_path(path, key), out);
                sanitized.insert(key.clone(), checked);
            }
            _ => {
                sanitized.insert(key.clone(), v.clone());
            }
        }
    }

    Value::Object(sanitized)
}
