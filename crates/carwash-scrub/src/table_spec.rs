use std::fmt;
use std::sync::Arc;

use carwash_core::{ConfigError, ConfigResult, Record, Value};

use crate::errors::FormatError;
use crate::formatter::{FieldFormatter, FormatterShape, RecordFormatter};
use crate::generators::Generator;

/// Resolved formatters of one table.
#[derive(Clone)]
pub enum TableTransform {
    /// Formatters by field name, in field order.
    Fields(Vec<(String, Arc<dyn FieldFormatter>)>),
    Record(Arc<dyn RecordFormatter>),
}

impl TableTransform {
    pub fn shape(&self) -> FormatterShape {
        match self {
            TableTransform::Fields(_) => FormatterShape::Field,
            TableTransform::Record(_) => FormatterShape::Record,
        }
    }
}

impl fmt::Debug for TableTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableTransform::Fields(fields) => f
                .debug_list()
                .entries(fields.iter().map(|(field, _)| field))
                .finish(),
            TableTransform::Record(_) => f.write_str("Record(..)"),
        }
    }
}

/// Result of transforming one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChange {
    /// Fields to write back. Never contains the primary key.
    pub updates: Record,
    /// Primary-key value a record formatter tried to set.
    pub ignored_key: Option<Value>,
    /// Configured fields the record does not have.
    pub missing_fields: Vec<String>,
}

impl RecordChange {
    /// `record` with the updates applied.
    pub fn merged(&self, record: &Record) -> Record {
        let mut merged = record.clone();
        merged.extend(self.updates.clone());
        merged
    }
}

/// How one table's records are rewritten.
#[derive(Debug, Clone)]
pub struct TableSpec {
    table: String,
    primary_key: String,
    transform: TableTransform,
}

impl TableSpec {
    /// Fails when a field formatter targets the primary key.
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        transform: TableTransform,
    ) -> ConfigResult<Self> {
        let table = table.into();
        let primary_key = primary_key.into();
        if let TableTransform::Fields(fields) = &transform {
            if fields.iter().any(|(field, _)| *field == primary_key) {
                return Err(ConfigError::invalid_formatter(
                    format!("{table}.{primary_key}"),
                    "the primary key cannot be scrubbed",
                ));
            }
        }
        Ok(Self {
            table,
            primary_key,
            transform,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn transform(&self) -> &TableTransform {
        &self.transform
    }

    pub fn shape(&self) -> FormatterShape {
        self.transform.shape()
    }

    pub fn apply(
        &self,
        generator: &dyn Generator,
        record: &Record,
    ) -> Result<RecordChange, FormatError> {
        let mut change = RecordChange::default();
        match &self.transform {
            TableTransform::Fields(fields) => {
                for (field, formatter) in fields {
                    match record.get(field) {
                        Some(current) => {
                            let value = formatter.format(generator, current)?;
                            change.updates.insert(field.clone(), value);
                        }
                        None => change.missing_fields.push(field.clone()),
                    }
                }
            }
            TableTransform::Record(formatter) => {
                let result = formatter.format(generator, record)?;
                for (field, value) in result {
                    if field == self.primary_key {
                        if record.get(&field) != Some(&value) {
                            change.ignored_key = Some(value);
                        }
                        continue;
                    }
                    change.updates.insert(field, value);
                }
            }
        }
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use carwash_core::Arg;

    use super::*;

    struct Stub;

    impl Generator for Stub {
        fn invoke(&self, name: &str, _args: &[Arg]) -> Result<Value, FormatError> {
            Ok(Value::Text(format!("fake {name}")))
        }

        fn capabilities(&self) -> Vec<&str> {
            Vec::new()
        }
    }

    fn george() -> Record {
        Record::from([
            ("id".to_string(), Value::Int(1)),
            ("first_name".to_string(), Value::from("George")),
            ("last_name".to_string(), Value::from("Costanza")),
        ])
    }

    #[test]
    fn field_map_only_touches_configured_fields() {
        let formatter: Arc<dyn FieldFormatter> = Arc::new(
            |_: &dyn Generator, _: &Value| -> Result<Value, FormatError> { Ok(Value::from("Foo")) },
        );
        let spec = TableSpec::new(
            "users",
            "id",
            TableTransform::Fields(vec![
                ("first_name".to_string(), Arc::clone(&formatter)),
                ("nickname".to_string(), formatter),
            ]),
        )
        .expect("spec");

        let record = george();
        let change = spec.apply(&Stub, &record).expect("apply");
        assert_eq!(change.updates.len(), 1);
        assert_eq!(change.missing_fields, vec!["nickname".to_string()]);

        let merged = change.merged(&record);
        assert_eq!(merged["first_name"], Value::from("Foo"));
        assert_eq!(merged["last_name"], record["last_name"]);
        assert_eq!(merged["id"], Value::Int(1));
    }

    #[test]
    fn record_formatter_cannot_change_the_key() {
        let formatter: Arc<dyn RecordFormatter> =
            Arc::new(|_: &dyn Generator, _: &Record| -> Result<Record, FormatError> {
                Ok(Record::from([
                    ("id".to_string(), Value::Int(99)),
                    ("first_name".to_string(), Value::from("Foo")),
                ]))
            });
        let spec = TableSpec::new("users", "id", TableTransform::Record(formatter)).expect("spec");
        let change = spec.apply(&Stub, &george()).expect("apply");
        assert_eq!(change.ignored_key, Some(Value::Int(99)));
        assert!(!change.updates.contains_key("id"));
        assert_eq!(change.updates["first_name"], Value::from("Foo"));
    }

    #[test]
    fn key_column_cannot_have_a_field_formatter() {
        let formatter: Arc<dyn FieldFormatter> = Arc::new(crate::formatters::Null);
        let err = TableSpec::new(
            "users",
            "id",
            TableTransform::Fields(vec![("id".to_string(), formatter)]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormatter { .. }));
    }
}
