//! The invocation envelope returned for every action call.
//!
//! Internally an [`Envelope`] is a tagged enum; on the wire it keeps the
//! `{"status": "success", ...fields}` / `{"status": "error", "message": ...}`
//! shape tool runtimes already understand.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Map<String, Value>),
    Error { message: String },
}

impl Envelope {
    /// Wrap a handler's domain fields. Objects are flattened into the
    /// envelope; any other value is placed under `result`.
    pub fn success(fields: Value) -> Self {
        match fields {
            Value::Object(mut map) => {
                map.remove("status");
                Envelope::Success(map)
            }
            Value::Null => Envelope::Success(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                Envelope::Success(map)
            }
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error {
            message: message.into(),
        }
    }

    /// Render an error with its full context chain, outermost first.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Envelope::error(format!("{err:#}"))
    }

    /// Interpret a handler's return value. Handlers that report a soft
    /// failure themselves (`"status": "error"`) keep their message.
    pub fn from_handler(value: Value) -> Self {
        if value.get("status").and_then(Value::as_str) == Some("error") {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("action failed without a message");
            return Envelope::error(message);
        }
        Envelope::success(value)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// The error message, or the optional `message` field of a success.
    pub fn message(&self) -> Option<&str> {
        match self {
            Envelope::Error { message } => Some(message),
            Envelope::Success(fields) => fields.get("message").and_then(Value::as_str),
        }
    }

    /// A domain field of a successful envelope.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Envelope::Success(fields) => fields.get(key),
            Envelope::Error { .. } => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Envelope::Success(fields) => {
                let mut map = Map::with_capacity(fields.len() + 1);
                map.insert("status".to_string(), json!("success"));
                map.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                Value::Object(map)
            }
            Envelope::Error { message } => json!({
                "status": "error",
                "message": message,
            }),
        }
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        envelope.to_value()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value.get("status").and_then(Value::as_str) {
            Some("success") => Ok(Envelope::success(value)),
            Some("error") => Ok(Envelope::from_handler(value)),
            Some(other) => Err(D::Error::custom(format!("unknown envelope status '{other}'"))),
            None => Err(D::Error::missing_field("status")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn success_flattens_domain_fields() {
        let env = Envelope::success(json!({ "signature": "5abc", "status": "ignored" }));
        assert_eq!(env.to_value(), json!({ "status": "success", "signature": "5abc" }));
    }

    #[test]
    fn scalar_results_are_wrapped() {
        let env = Envelope::success(json!(42));
        assert_eq!(env.get("result"), Some(&json!(42)));
    }

    #[test]
    fn handler_soft_errors_are_preserved() {
        let env = Envelope::from_handler(json!({ "status": "error", "message": "No performance samples available" }));
        assert_eq!(env, Envelope::error("No performance samples available"));
    }

    #[test]
    fn error_chain_is_rendered_outermost_first() {
        let err = Err::<(), _>(anyhow::anyhow!("RPC down"))
            .context("Transfer failed")
            .unwrap_err();
        let env = Envelope::from_error(&err);
        assert_eq!(env.message(), Some("Transfer failed: RPC down"));
        assert_eq!(env.to_value(), json!({ "status": "error", "message": "Transfer failed: RPC down" }));
    }

    #[test]
    fn deserializes_wire_shape() {
        let env: Envelope = serde_json::from_value(json!({ "status": "success", "tps": 3500 })).unwrap();
        assert_eq!(env.get("tps"), Some(&json!(3500)));

        let err = serde_json::from_value::<Envelope>(json!({ "tps": 1 })).unwrap_err();
        assert!(err.to_string().contains("status"));
    }
}
