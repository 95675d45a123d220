use sha2::{Digest, Sha256 as Sha256Hasher};

use carwash_core::Value;

use crate::errors::FormatError;
use crate::formatter::FieldFormatter;
use crate::generators::Generator;

pub const REDACTED: &str = "[redacted]";

/// Clears the field.
#[derive(Debug, Default, Clone, Copy)]
pub struct Null;

impl FieldFormatter for Null {
    fn format(&self, _generator: &dyn Generator, _value: &Value) -> Result<Value, FormatError> {
        Ok(Value::Null)
    }
}

/// Replaces any non-null value with a fixed marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct Redact;

impl FieldFormatter for Redact {
    fn format(&self, _generator: &dyn Generator, value: &Value) -> Result<Value, FormatError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Text(REDACTED.to_string()))
    }
}

/// Hex SHA-256 of the value's text form. Equal inputs stay equal, so joins
/// on the scrubbed column keep working.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256;

impl FieldFormatter for Sha256 {
    fn format(&self, _generator: &dyn Generator, value: &Value) -> Result<Value, FormatError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let digest = Sha256Hasher::digest(value.to_string().as_bytes());
        Ok(Value::Text(hex::encode(digest)))
    }
}
