use std::fmt;

use serde::{Deserialize, Serialize};

use carwash_core::{Arg, Record, Value};

use crate::errors::FormatError;
use crate::generators::Generator;

/// Replaces a single field value.
pub trait FieldFormatter: Send + Sync {
    fn format(&self, generator: &dyn Generator, value: &Value) -> Result<Value, FormatError>;
}

/// Produces a partial record from a whole record.
///
/// Only the keys of the returned record are written back.
pub trait RecordFormatter: Send + Sync {
    fn format(&self, generator: &dyn Generator, record: &Record) -> Result<Record, FormatError>;
}

impl<F> FieldFormatter for F
where
    F: Fn(&dyn Generator, &Value) -> Result<Value, FormatError> + Send + Sync,
{
    fn format(&self, generator: &dyn Generator, value: &Value) -> Result<Value, FormatError> {
        self(generator, value)
    }
}

impl<F> RecordFormatter for F
where
    F: Fn(&dyn Generator, &Record) -> Result<Record, FormatError> + Send + Sync,
{
    fn format(&self, generator: &dyn Generator, record: &Record) -> Result<Record, FormatError> {
        self(generator, record)
    }
}

/// Which of the two formatter contracts a table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatterShape {
    Field,
    Record,
}

impl fmt::Display for FormatterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterShape::Field => f.write_str("field"),
            FormatterShape::Record => f.write_str("record"),
        }
    }
}

/// Field formatter that calls a generator capability by name.
///
/// The name is looked up on every call, so capabilities registered after
/// resolution are honoured and unknown names fail per record.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedGeneratorFormatter {
    name: String,
    args: Vec<Arg>,
}

impl NamedGeneratorFormatter {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }
}

impl FieldFormatter for NamedGeneratorFormatter {
    fn format(&self, generator: &dyn Generator, _value: &Value) -> Result<Value, FormatError> {
        generator.invoke(&self.name, &self.args)
    }
}
