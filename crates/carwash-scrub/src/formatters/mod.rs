//! Formatter types constructible by name.
//!
//! Configuration files can only name a formatter type, so every type that
//! may appear as `{ type = "..." }` or `"crate::Type"` has to be registered
//! here before the run starts.

mod builtin;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::formatter::{FieldFormatter, FormatterShape, RecordFormatter};

pub use builtin::{Null, REDACTED, Redact, Sha256};

type FieldCtor = Box<dyn Fn() -> Arc<dyn FieldFormatter> + Send + Sync>;
type RecordCtor = Box<dyn Fn() -> Arc<dyn RecordFormatter> + Send + Sync>;

/// Registry of named formatter constructors.
pub struct FormatterTypes {
    field: BTreeMap<String, FieldCtor>,
    record: BTreeMap<String, RecordCtor>,
}

impl FormatterTypes {
    /// Registry without any types.
    pub fn new() -> Self {
        Self {
            field: BTreeMap::new(),
            record: BTreeMap::new(),
        }
    }

    /// Registry holding `carwash::Null`, `carwash::Redact` and `carwash::Sha256`.
    pub fn with_builtins() -> Self {
        let mut types = Self::new();
        types.register_field::<Null>("carwash::Null");
        types.register_field::<Redact>("carwash::Redact");
        types.register_field::<Sha256>("carwash::Sha256");
        types
    }

    pub fn register_field<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: FieldFormatter + Default + 'static,
    {
        self.register_field_with(name, || T::default())
    }

    pub fn register_record<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: RecordFormatter + Default + 'static,
    {
        self.register_record_with(name, || T::default())
    }

    /// Register a field formatter built by `ctor`. Re-registering a name
    /// replaces the previous constructor.
    pub fn register_field_with<T, C>(&mut self, name: impl Into<String>, ctor: C) -> &mut Self
    where
        T: FieldFormatter + 'static,
        C: Fn() -> T + Send + Sync + 'static,
    {
        self.field.insert(
            name.into(),
            Box::new(move || Arc::new(ctor()) as Arc<dyn FieldFormatter>),
        );
        self
    }

    pub fn register_record_with<T, C>(&mut self, name: impl Into<String>, ctor: C) -> &mut Self
    where
        T: RecordFormatter + 'static,
        C: Fn() -> T + Send + Sync + 'static,
    {
        self.record.insert(
            name.into(),
            Box::new(move || Arc::new(ctor()) as Arc<dyn RecordFormatter>),
        );
        self
    }

    /// Construct a new field formatter instance.
    pub fn construct_field(&self, name: &str) -> Option<Arc<dyn FieldFormatter>> {
        self.field.get(name).map(|ctor| ctor())
    }

    /// Construct a new record formatter instance.
    pub fn construct_record(&self, name: &str) -> Option<Arc<dyn RecordFormatter>> {
        self.record.get(name).map(|ctor| ctor())
    }

    /// Registered names with their shape, sorted by name.
    pub fn names(&self) -> Vec<(&str, FormatterShape)> {
        let mut names: Vec<(&str, FormatterShape)> = self
            .field
            .keys()
            .map(|name| (name.as_str(), FormatterShape::Field))
            .chain(
                self.record
                    .keys()
                    .map(|name| (name.as_str(), FormatterShape::Record)),
            )
            .collect();
        names.sort();
        names
    }
}

impl Default for FormatterTypes {
    fn default() -> Self {
        Self::with_builtins()
    }
}
