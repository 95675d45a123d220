use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scalar value stored in a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// A record read from storage: field name to value.
pub type Record = BTreeMap<String, Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Convert a JSON value read from storage. Nested arrays and objects are
    /// kept as their JSON text since records only hold scalars.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Int(value),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Value::Text(value),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::Text(nested.to_string())
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(value) => serde_json::Value::String(value.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Positional argument passed to a named generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Arg {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Arg {
    /// Parse one comma-separated token of a `name:arg,arg` generator string.
    pub fn parse_token(token: &str) -> Self {
        let token = token.trim();
        match token {
            "true" => return Arg::Bool(true),
            "false" => return Arg::Bool(false),
            _ => {}
        }
        if let Ok(value) = token.parse::<i64>() {
            return Arg::Int(value);
        }
        if let Ok(value) = token.parse::<f64>() {
            return Arg::Float(value);
        }
        Arg::Text(token.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Arg::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Bool(value) => write!(f, "{value}"),
            Arg::Int(value) => write!(f, "{value}"),
            Arg::Float(value) => write!(f, "{value}"),
            Arg::Text(value) => f.write_str(value),
        }
    }
}

impl From<Arg> for Value {
    fn from(value: Arg) -> Self {
        match value {
            Arg::Bool(value) => Value::Bool(value),
            Arg::Int(value) => Value::Int(value),
            Arg::Float(value) => Value::Float(value),
            Arg::Text(value) => Value::Text(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generator_tokens() {
        assert_eq!(Arg::parse_token(" 3"), Arg::Int(3));
        assert_eq!(Arg::parse_token("true"), Arg::Bool(true));
        assert_eq!(Arg::parse_token("0.5"), Arg::Float(0.5));
        assert_eq!(Arg::parse_token("en"), Arg::Text("en".to_string()));
    }

    #[test]
    fn nested_json_is_kept_as_text() {
        let value = Value::from_json(serde_json::json!({"a": [1, 2]}));
        assert_eq!(value, Value::Text(r#"{"a":[1,2]}"#.to_string()));
    }

    #[test]
    fn values_serialize_as_plain_scalars() {
        let record: Record = [
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::from("George")),
            ("deleted_at".to_string(), Value::Null),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&record).expect("serialize record");
        assert_eq!(json, r#"{"deleted_at":null,"id":1,"name":"George"}"#);
        let back: Record = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(back, record);
    }
}
