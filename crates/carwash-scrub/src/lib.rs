//! Formatter resolution and record scrubbing engine for Carwash.
//!
//! A [`Configuration`] names, per table, either one formatter per field or a
//! single whole-record formatter. The [`ScrubEngine`] resolves it into
//! [`TableSpec`]s, pages through each table in storage, rewrites records,
//! and reports what happened.

pub mod args;
pub mod configuration;
pub mod engine;
pub mod errors;
pub mod faker_rs;
pub mod formatter;
pub mod formatters;
pub mod generators;
pub mod model;
pub mod resolver;
pub mod table_spec;

pub use configuration::{
    Configuration, FieldSpec, FormatterSpec, RecordSpec, TableConfig, TableEntry,
    parse_generator_string,
};
pub use engine::ScrubEngine;
pub use errors::{FormatError, ScrubError};
pub use faker_rs::{FakerGenerator, LocaleKey};
pub use formatter::{FieldFormatter, FormatterShape, NamedGeneratorFormatter, RecordFormatter};
pub use formatters::FormatterTypes;
pub use generators::{Capability, Generator};
pub use model::{
    RecordFailure, RunStatus, ScrubIssue, ScrubOptions, ScrubReport, TableOutcome, TableReport,
};
pub use resolver::Resolver;
pub use table_spec::{RecordChange, TableSpec, TableTransform};
