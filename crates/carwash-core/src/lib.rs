//! Core contracts and helpers for Carwash.
//!
//! This crate defines the record value model, the on-disk configuration file
//! model, and utilities shared across the store, scrub engine, and CLI.

pub mod config;
pub mod error;
pub mod redaction;
pub mod value;

pub use config::{
    ConfigFile, GeneratorEntry, RawFormatter, RawTableEntry, TableBlock, TypeEntry,
    config_json_schema,
};
pub use error::{ConfigError, ConfigResult};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use value::{Arg, Record, Value};

/// Current configuration contract version for `carwash` config files.
pub const CONFIG_VERSION: &str = "0.1";
