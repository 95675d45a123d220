//! In-memory scrub configuration.
//!
//! A [`Configuration`] is either built programmatically (the only way to use
//! invokable instances and closures) or converted from a parsed
//! [`ConfigFile`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use carwash_core::{
    Arg, ConfigError, ConfigFile, ConfigResult, RawFormatter, RawTableEntry, Record, Value,
};

use crate::errors::FormatError;
use crate::formatter::{FieldFormatter, FormatterShape, RecordFormatter};
use crate::generators::Generator;

/// Unresolved formatter as configured.
pub enum FormatterSpec<F: ?Sized> {
    /// Generator capability called with positional arguments.
    NamedGenerator { name: String, args: Vec<Arg> },
    /// Formatter instance used as is.
    Invokable(Arc<F>),
    /// Name of a type registered in `FormatterTypes`.
    TypeName(String),
    /// Inline function.
    Closure(Arc<F>),
}

pub type FieldSpec = FormatterSpec<dyn FieldFormatter>;
pub type RecordSpec = FormatterSpec<dyn RecordFormatter>;

impl<F: ?Sized> FormatterSpec<F> {
    pub fn type_name(name: impl Into<String>) -> Self {
        FormatterSpec::TypeName(name.into())
    }

    /// Stable variant name for resolver log events.
    pub fn kind(&self) -> &'static str {
        match self {
            FormatterSpec::NamedGenerator { .. } => "named_generator",
            FormatterSpec::Invokable(_) => "invokable",
            FormatterSpec::TypeName(_) => "type_name",
            FormatterSpec::Closure(_) => "closure",
        }
    }
}

impl<F: ?Sized> Clone for FormatterSpec<F> {
    fn clone(&self) -> Self {
        match self {
            FormatterSpec::NamedGenerator { name, args } => FormatterSpec::NamedGenerator {
                name: name.clone(),
                args: args.clone(),
            },
            FormatterSpec::Invokable(instance) => FormatterSpec::Invokable(Arc::clone(instance)),
            FormatterSpec::TypeName(name) => FormatterSpec::TypeName(name.clone()),
            FormatterSpec::Closure(function) => FormatterSpec::Closure(Arc::clone(function)),
        }
    }
}

impl<F: ?Sized> fmt::Debug for FormatterSpec<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatterSpec::NamedGenerator { name, args } => f
                .debug_struct("NamedGenerator")
                .field("name", name)
                .field("args", args)
                .finish(),
            FormatterSpec::Invokable(_) => f.write_str("Invokable(..)"),
            FormatterSpec::TypeName(name) => f.debug_tuple("TypeName").field(name).finish(),
            FormatterSpec::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

impl FieldSpec {
    pub fn named(name: impl Into<String>, args: Vec<Arg>) -> Self {
        FormatterSpec::NamedGenerator {
            name: name.into(),
            args,
        }
    }

    /// Parse `"firstName"`, `"words:3,true"` or a `"crate::Type"` name.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        if is_type_name(text) {
            return Ok(FormatterSpec::TypeName(text.trim().to_string()));
        }
        let (name, args) = parse_generator_string(text)?;
        Ok(FormatterSpec::NamedGenerator { name, args })
    }

    pub fn invokable<T: FieldFormatter + 'static>(instance: T) -> Self {
        FormatterSpec::Invokable(Arc::new(instance))
    }

    pub fn closure<C>(function: C) -> Self
    where
        C: Fn(&dyn Generator, &Value) -> Result<Value, FormatError> + Send + Sync + 'static,
    {
        FormatterSpec::Closure(Arc::new(function))
    }

    fn from_raw(raw: &RawFormatter, location: &str) -> ConfigResult<Self> {
        match raw {
            RawFormatter::Spec(text) => Self::parse(text)
                .map_err(|err| ConfigError::invalid_formatter(location, err.to_string())),
            RawFormatter::Generator(entry) => {
                let name = entry.generator.trim();
                if name.is_empty() {
                    return Err(ConfigError::invalid_formatter(location, "generator name is empty"));
                }
                Ok(Self::named(name, entry.args.clone()))
            }
            RawFormatter::Type(entry) => type_spec(&entry.type_name, location),
        }
    }
}

impl RecordSpec {
    pub fn invokable<T: RecordFormatter + 'static>(instance: T) -> Self {
        FormatterSpec::Invokable(Arc::new(instance))
    }

    pub fn closure<C>(function: C) -> Self
    where
        C: Fn(&dyn Generator, &Record) -> Result<Record, FormatError> + Send + Sync + 'static,
    {
        FormatterSpec::Closure(Arc::new(function))
    }

    fn from_raw(raw: &RawFormatter, location: &str) -> ConfigResult<Self> {
        match raw {
            RawFormatter::Spec(text) if is_type_name(text) => type_spec(text, location),
            RawFormatter::Spec(_) | RawFormatter::Generator(_) => {
                Err(ConfigError::invalid_formatter(
                    location,
                    "a named generator yields a single value and cannot format a whole record",
                ))
            }
            RawFormatter::Type(entry) => type_spec(&entry.type_name, location),
        }
    }
}

fn is_type_name(text: &str) -> bool {
    text.contains("::")
}

fn type_spec<F: ?Sized>(name: &str, location: &str) -> ConfigResult<FormatterSpec<F>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::invalid_formatter(location, "type name is empty"));
    }
    Ok(FormatterSpec::TypeName(name.to_string()))
}

/// Split `"name:arg,arg"` into a generator name and typed arguments.
pub fn parse_generator_string(text: &str) -> ConfigResult<(String, Vec<Arg>)> {
    let (name, rest) = match text.split_once(':') {
        Some((name, rest)) => (name.trim(), Some(rest)),
        None => (text.trim(), None),
    };
    if name.is_empty() {
        return Err(ConfigError::Invalid(format!("generator name is empty in '{text}'")));
    }
    let args = rest
        .map(|rest| {
            rest.split(',')
                .map(|token| Arg::parse_token(token.trim()))
                .collect()
        })
        .unwrap_or_default();
    Ok((name.to_string(), args))
}

/// How one table is scrubbed.
#[derive(Debug, Clone)]
pub enum TableEntry {
    /// One formatter per field; other fields pass through.
    Fields(BTreeMap<String, FieldSpec>),
    /// One formatter for the whole record.
    Record(RecordSpec),
}

impl TableEntry {
    pub fn shape(&self) -> FormatterShape {
        match self {
            TableEntry::Fields(_) => FormatterShape::Field,
            TableEntry::Record(_) => FormatterShape::Record,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableConfig {
    pub entry: TableEntry,
    /// Overrides the key column reported by storage.
    pub primary_key: Option<String>,
}

impl TableConfig {
    pub fn new(entry: TableEntry) -> Self {
        Self {
            entry,
            primary_key: None,
        }
    }
}

/// Tables to scrub, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    tables: BTreeMap<String, TableConfig>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field formatter. Replaces a whole-record formatter on the same table.
    pub fn field(
        mut self,
        table: impl Into<String>,
        field: impl Into<String>,
        spec: FieldSpec,
    ) -> Self {
        let config = self
            .tables
            .entry(table.into())
            .or_insert_with(|| TableConfig::new(TableEntry::Fields(BTreeMap::new())));
        match &mut config.entry {
            TableEntry::Fields(fields) => {
                fields.insert(field.into(), spec);
            }
            TableEntry::Record(_) => {
                config.entry = TableEntry::Fields(BTreeMap::from([(field.into(), spec)]));
            }
        }
        self
    }

    /// Set the whole-record formatter. Replaces any field formatters on the table.
    pub fn record(mut self, table: impl Into<String>, spec: RecordSpec) -> Self {
        let table = table.into();
        let primary_key = self
            .tables
            .remove(&table)
            .and_then(|config| config.primary_key);
        self.tables.insert(
            table,
            TableConfig {
                entry: TableEntry::Record(spec),
                primary_key,
            },
        );
        self
    }

    pub fn primary_key(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.tables
            .entry(table.into())
            .or_insert_with(|| TableConfig::new(TableEntry::Fields(BTreeMap::new())))
            .primary_key = Some(column.into());
        self
    }

    pub fn insert(&mut self, table: impl Into<String>, config: TableConfig) {
        self.tables.insert(table.into(), config);
    }

    pub fn get(&self, table: &str) -> Option<&TableConfig> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableConfig)> {
        self.tables
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Convert a parsed file, rejecting blocks that declare both shapes.
    pub fn from_file(file: &ConfigFile) -> ConfigResult<Self> {
        let mut configuration = Self::new();
        for (table, raw) in &file.tables {
            let config = match raw {
                RawTableEntry::Shorthand(text) => TableConfig::new(TableEntry::Record(
                    RecordSpec::from_raw(&RawFormatter::Spec(text.clone()), table)?,
                )),
                RawTableEntry::Block(block) => {
                    let entry = match &block.record {
                        Some(_) if block.has_fields() => {
                            return Err(ConfigError::AmbiguousTableSpec {
                                table: table.clone(),
                            });
                        }
                        Some(record) => TableEntry::Record(RecordSpec::from_raw(
                            record,
                            &format!("{table}.record"),
                        )?),
                        None => {
                            let mut fields = BTreeMap::new();
                            for (field, formatter) in block.field_entries(table)? {
                                let spec =
                                    FieldSpec::from_raw(&formatter, &format!("{table}.{field}"))?;
                                fields.insert(field, spec);
                            }
                            TableEntry::Fields(fields)
                        }
                    };
                    TableConfig {
                        entry,
                        primary_key: block.primary_key.clone(),
                    }
                }
            };
            configuration.insert(table.clone(), config);
        }
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generator_strings() {
        let (name, args) = parse_generator_string("words:3,true").expect("parse");
        assert_eq!(name, "words");
        assert_eq!(args, vec![Arg::Int(3), Arg::Bool(true)]);

        let (name, args) = parse_generator_string("safeEmail").expect("parse");
        assert_eq!(name, "safeEmail");
        assert!(args.is_empty());

        let (_, args) = parse_generator_string("date: 2020-01-01 , 2021-01-01").expect("parse");
        assert_eq!(
            args,
            vec![
                Arg::Text("2020-01-01".to_string()),
                Arg::Text("2021-01-01".to_string())
            ]
        );

        assert!(parse_generator_string(":3").is_err());
    }

    #[test]
    fn bare_strings_are_classified() {
        assert!(matches!(
            FieldSpec::parse("carwash::Redact").expect("type"),
            FormatterSpec::TypeName(name) if name == "carwash::Redact"
        ));
        assert!(matches!(
            FieldSpec::parse("firstName").expect("named"),
            FormatterSpec::NamedGenerator { name, .. } if name == "firstName"
        ));
    }

    #[test]
    fn kinds_name_every_variant() {
        assert_eq!(FieldSpec::named("firstName", Vec::new()).kind(), "named_generator");
        assert_eq!(FieldSpec::type_name("carwash::Redact").kind(), "type_name");
        assert_eq!(FieldSpec::closure(|_, value| Ok(value.clone())).kind(), "closure");
        assert_eq!(FieldSpec::invokable(crate::formatters::Null).kind(), "invokable");
    }

    #[test]
    fn builders_replace_the_other_shape() {
        let config = Configuration::new()
            .primary_key("users", "user_id")
            .field("users", "email", FieldSpec::named("safeEmail", Vec::new()))
            .record("users", RecordSpec::type_name("app::Users"));
        let table = config.get("users").expect("users");
        assert!(matches!(table.entry, TableEntry::Record(_)));
        assert_eq!(table.primary_key.as_deref(), Some("user_id"));

        let config = config.field("users", "email", FieldSpec::named("email", Vec::new()));
        assert!(matches!(
            &config.get("users").expect("users").entry,
            TableEntry::Fields(fields) if fields.len() == 1
        ));
    }

    #[test]
    fn file_with_both_shapes_is_ambiguous() {
        let file = ConfigFile::from_json_str(
            r#"{"tables": {"users": {"record": {"type": "app::Users"}, "email": "safeEmail"}}}"#,
        )
        .expect("parse");
        assert!(matches!(
            Configuration::from_file(&file),
            Err(ConfigError::AmbiguousTableSpec { table }) if table == "users"
        ));
    }

    #[test]
    fn named_generator_cannot_format_a_record() {
        let file =
            ConfigFile::from_json_str(r#"{"tables": {"users": "firstName"}}"#).expect("parse");
        assert!(matches!(
            Configuration::from_file(&file),
            Err(ConfigError::InvalidFormatter { .. })
        ));
    }

    #[test]
    fn converts_every_file_shape() {
        let file = ConfigFile::from_json_str(
            r#"{
                "tables": {
                    "users": {
                        "primary_key": "user_id",
                        "first_name": "firstName",
                        "bio": "words:3,true",
                        "password": {"generator": "password", "args": [12, 16]},
                        "ssn": {"type": "carwash::Redact"},
                        "fields": {"record": "word"}
                    },
                    "sessions": "app::ScrubSession",
                    "audit": {"record": {"type": "app::ScrubAudit"}}
                }
            }"#,
        )
        .expect("parse");
        let config = Configuration::from_file(&file).expect("convert");
        assert_eq!(config.len(), 3);

        let users = config.get("users").expect("users");
        assert_eq!(users.primary_key.as_deref(), Some("user_id"));
        let TableEntry::Fields(fields) = &users.entry else {
            panic!("users should be a field map");
        };
        assert_eq!(fields.len(), 5);
        assert!(matches!(
            &fields["password"],
            FormatterSpec::NamedGenerator { name, args }
                if name == "password" && args == &vec![Arg::Int(12), Arg::Int(16)]
        ));
        assert!(matches!(
            &fields["ssn"],
            FormatterSpec::TypeName(name) if name == "carwash::Redact"
        ));
        assert!(matches!(
            &fields["record"],
            FormatterSpec::NamedGenerator { name, .. } if name == "word"
        ));

        for table in ["sessions", "audit"] {
            assert!(matches!(
                config.get(table).expect(table).entry,
                TableEntry::Record(FormatterSpec::TypeName(_))
            ));
        }
    }

    fn field_names(config: &Configuration, table: &str) -> Vec<String> {
        match &config.get(table).expect(table).entry {
            TableEntry::Fields(fields) => fields.keys().cloned().collect(),
            TableEntry::Record(_) => panic!("{table} should be a field map"),
        }
    }

    #[test]
    fn columns_named_like_formatter_keys_are_fields() {
        let file = ConfigFile::from_json_str(
            r#"{
                "tables": {
                    "users": {"type": "carwash::Redact"},
                    "accounts": {"generator": "firstName"},
                    "people": {"generator": "firstName", "email": "safeEmail"}
                }
            }"#,
        )
        .expect("parse");
        let config = Configuration::from_file(&file).expect("convert");

        assert_eq!(field_names(&config, "users"), vec!["type"]);
        assert_eq!(field_names(&config, "accounts"), vec!["generator"]);
        assert_eq!(field_names(&config, "people"), vec!["email", "generator"]);
        let TableEntry::Fields(fields) = &config.get("users").expect("users").entry else {
            unreachable!();
        };
        assert!(matches!(
            &fields["type"],
            FormatterSpec::TypeName(name) if name == "carwash::Redact"
        ));
    }
}
