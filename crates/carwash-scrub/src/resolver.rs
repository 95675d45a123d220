use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use carwash_core::{Arg, ConfigError};

use crate::configuration::{FieldSpec, FormatterSpec, RecordSpec, TableConfig, TableEntry};
use crate::errors::ScrubError;
use crate::formatter::{
    FieldFormatter, FormatterShape, NamedGeneratorFormatter, RecordFormatter,
};
use crate::formatters::FormatterTypes;
use crate::table_spec::{TableSpec, TableTransform};

/// Turns formatter specs into callable formatters for one run.
///
/// Type names are constructed on first use and shared afterwards; named
/// generators are shared per `name:args`. Drop the resolver to discard them.
pub struct Resolver<'a> {
    types: &'a FormatterTypes,
    named: HashMap<String, Arc<dyn FieldFormatter>>,
    field_types: HashMap<String, Arc<dyn FieldFormatter>>,
    record_types: HashMap<String, Arc<dyn RecordFormatter>>,
}

impl<'a> Resolver<'a> {
    pub fn new(types: &'a FormatterTypes) -> Self {
        Self {
            types,
            named: HashMap::new(),
            field_types: HashMap::new(),
            record_types: HashMap::new(),
        }
    }

    pub fn resolve_field(
        &mut self,
        spec: &FieldSpec,
    ) -> Result<Arc<dyn FieldFormatter>, ScrubError> {
        match spec {
            FormatterSpec::NamedGenerator { name, args } => {
                let key = named_key(name, args);
                let formatter = self.named.entry(key).or_insert_with(|| {
                    Arc::new(NamedGeneratorFormatter::new(name.clone(), args.clone()))
                });
                Ok(Arc::clone(formatter))
            }
            FormatterSpec::Invokable(instance) => Ok(Arc::clone(instance)),
            FormatterSpec::Closure(function) => Ok(Arc::clone(function)),
            FormatterSpec::TypeName(name) => {
                if let Some(formatter) = self.field_types.get(name) {
                    return Ok(Arc::clone(formatter));
                }
                let formatter = self
                    .types
                    .construct_field(name)
                    .ok_or_else(|| ScrubError::UnresolvableType {
                        name: name.clone(),
                        shape: FormatterShape::Field,
                    })?;
                debug!(type_name = %name, shape = "field", "formatter type constructed");
                self.field_types.insert(name.clone(), Arc::clone(&formatter));
                Ok(formatter)
            }
        }
    }

    pub fn resolve_record(
        &mut self,
        spec: &RecordSpec,
    ) -> Result<Arc<dyn RecordFormatter>, ScrubError> {
        match spec {
            FormatterSpec::NamedGenerator { name, .. } => Err(ConfigError::invalid_formatter(
                name.clone(),
                "a named generator cannot format a whole record",
            )
            .into()),
            FormatterSpec::Invokable(instance) => Ok(Arc::clone(instance)),
            FormatterSpec::Closure(function) => Ok(Arc::clone(function)),
            FormatterSpec::TypeName(name) => {
                if let Some(formatter) = self.record_types.get(name) {
                    return Ok(Arc::clone(formatter));
                }
                let formatter = self
                    .types
                    .construct_record(name)
                    .ok_or_else(|| ScrubError::UnresolvableType {
                        name: name.clone(),
                        shape: FormatterShape::Record,
                    })?;
                debug!(type_name = %name, shape = "record", "formatter type constructed");
                self.record_types.insert(name.clone(), Arc::clone(&formatter));
                Ok(formatter)
            }
        }
    }

    pub fn resolve_entry(&mut self, entry: &TableEntry) -> Result<TableTransform, ScrubError> {
        match entry {
            TableEntry::Fields(fields) => {
                let mut resolved = Vec::with_capacity(fields.len());
                for (field, spec) in fields {
                    debug!(field = %field, kind = spec.kind(), "resolving field formatter");
                    resolved.push((field.clone(), self.resolve_field(spec)?));
                }
                Ok(TableTransform::Fields(resolved))
            }
            TableEntry::Record(spec) => {
                debug!(kind = spec.kind(), "resolving record formatter");
                Ok(TableTransform::Record(self.resolve_record(spec)?))
            }
        }
    }

    /// Resolve a table's formatters against its key column.
    pub fn build_table_spec(
        &mut self,
        table: &str,
        config: &TableConfig,
        primary_key: &str,
    ) -> Result<TableSpec, ScrubError> {
        let transform = self.resolve_entry(&config.entry)?;
        Ok(TableSpec::new(table, primary_key, transform)?)
    }
}

// Debug keeps `Int(3)` and `Text("3")` apart.
fn named_key(name: &str, args: &[Arg]) -> String {
    format!("{name}:{args:?}")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use carwash_core::{Record, Value};

    use super::*;
    use crate::errors::FormatError;
    use crate::generators::Generator;

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Default for Counted {
        fn default() -> Self {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            Counted
        }
    }

    impl FieldFormatter for Counted {
        fn format(&self, _generator: &dyn Generator, _value: &Value) -> Result<Value, FormatError> {
            Ok(Value::from("Foo"))
        }
    }

    #[test]
    fn type_names_are_constructed_once() {
        let mut types = FormatterTypes::new();
        types.register_field::<Counted>("test::Counted");
        let mut resolver = Resolver::new(&types);
        let spec = FieldSpec::type_name("test::Counted");
        let first = resolver.resolve_field(&spec).expect("first");
        let second = resolver.resolve_field(&spec).expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_or_wrong_shape_type_is_unresolvable() {
        let types = FormatterTypes::with_builtins();
        let mut resolver = Resolver::new(&types);
        assert!(matches!(
            resolver.resolve_field(&FieldSpec::type_name("app::Missing")),
            Err(ScrubError::UnresolvableType { shape: FormatterShape::Field, .. })
        ));
        assert!(matches!(
            resolver.resolve_record(&RecordSpec::type_name("carwash::Redact")),
            Err(ScrubError::UnresolvableType { shape: FormatterShape::Record, .. })
        ));
    }

    #[test]
    fn named_generators_are_shared_per_arguments() {
        let types = FormatterTypes::new();
        let mut resolver = Resolver::new(&types);
        let a = resolver
            .resolve_field(&FieldSpec::named("words", vec![Arg::Int(3)]))
            .expect("a");
        let b = resolver
            .resolve_field(&FieldSpec::named("words", vec![Arg::Int(3)]))
            .expect("b");
        let c = resolver
            .resolve_field(&FieldSpec::named("words", vec![Arg::Int(4)]))
            .expect("c");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn named_generator_in_record_position_is_a_config_error() {
        let types = FormatterTypes::new();
        let mut resolver = Resolver::new(&types);
        let spec = RecordSpec::NamedGenerator {
            name: "firstName".to_string(),
            args: Vec::new(),
        };
        assert!(matches!(
            resolver.resolve_record(&spec),
            Err(ScrubError::Configuration(ConfigError::InvalidFormatter { .. }))
        ));
    }

    #[test]
    fn instances_and_closures_pass_through() {
        let types = FormatterTypes::new();
        let mut resolver = Resolver::new(&types);
        let closure = RecordSpec::closure(|_, _| {
            Ok(Record::from([("first_name".to_string(), Value::from("Foo"))]))
        });
        let FormatterSpec::Closure(original) = &closure else {
            panic!("closure spec");
        };
        let resolved = resolver.resolve_record(&closure).expect("closure");
        assert!(Arc::ptr_eq(original, &resolved));
    }
}
